use crate::fetcher::BetFetcher;
use std::sync::Arc;

// ── Application shared state (read-only after startup) ──

/// Everything a request handler needs. Built once in `main` around the
/// injected store and dropped when the server stops.
pub struct AppState<S> {
    pub fetcher: BetFetcher<S>,
    /// Cap on the recent-records table.
    pub recent_limit: usize,
}

impl<S> AppState<S> {
    pub fn new(fetcher: BetFetcher<S>, recent_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            recent_limit,
        })
    }
}

pub mod auth;
pub mod client;
pub mod types;

use crate::errors::DashboardResult;
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::future::Future;

/// Outbound document-collection seam. The fetcher only ever talks to this.
/// Implementations must be cheap to share across request handlers.
pub trait DocumentStore: Send + Sync + 'static {
    /// Run one structured query and return every matching document,
    /// with store-typed values decoded to plain JSON.
    fn run_query(
        &self,
        query: &RecordQuery,
    ) -> impl Future<Output = DashboardResult<Vec<RawDocument>>> + Send;
}

/// A document as returned by the store: its id plus decoded fields.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RawDocument {
    pub id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOp {
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Store-agnostic description of a single collection query.
/// At most a handful of filters are ever set (range bounds + two equalities).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub collection: String,
    pub filters: SmallVec<[FieldFilter; 4]>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl RecordQuery {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: FilterValue) -> Self {
        self.filters.push(FieldFilter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// How timestamp bounds are encoded in range filters. Collections written
/// with native timestamps need `Native`; ones holding ISO strings need `Iso8601`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampEncoding {
    #[default]
    Native,
    Iso8601,
}

impl std::str::FromStr for TimestampEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp" | "native" => Ok(Self::Native),
            "iso8601" | "string" => Ok(Self::Iso8601),
            other => Err(format!("unknown timestamp encoding: {other}")),
        }
    }
}

/// Scripted in-memory store for tests. Replies are served in order; once
/// they run out every query fails.
#[cfg(test)]
pub(crate) mod fake {
    use super::{DocumentStore, RawDocument, RecordQuery};
    use crate::errors::{DashboardError, DashboardResult};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeStore {
        replies: Mutex<VecDeque<DashboardResult<Vec<RawDocument>>>>,
        seen: Mutex<Vec<RecordQuery>>,
    }

    impl FakeStore {
        pub fn with_replies(replies: Vec<DashboardResult<Vec<RawDocument>>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn queries(&self) -> Vec<RecordQuery> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl DocumentStore for FakeStore {
        async fn run_query(&self, query: &RecordQuery) -> DashboardResult<Vec<RawDocument>> {
            self.seen.lock().unwrap().push(query.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DashboardError::Network("store unreachable".into())))
        }
    }
}

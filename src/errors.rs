/// Domain-specific error types for the dashboard service.
/// Only startup errors are fatal. Query failures degrade to fallback or
/// empty data, malformed records are skipped, request errors become JSON.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("firestore API error: {status} {body}")]
    Firestore { status: u16, body: String },

    #[error("auth error: {0}")]
    Auth(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        DashboardError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(e: serde_json::Error) -> Self {
        DashboardError::Parse(e.to_string())
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

use crate::errors::{DashboardError, DashboardResult};
use crate::store::auth::ServiceAccountKey;
use crate::store::TimestampEncoding;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_account: ServiceAccountKey,
    pub firestore_base_url: String,
    pub collection: String,
    pub timestamp_encoding: TimestampEncoding,
    pub fallback_limit: u32,
    pub recent_limit: usize,
    pub static_dir: PathBuf,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> DashboardResult<Self> {
        dotenvy::dotenv().ok();

        let credentials = env_var("FIREBASE_CREDENTIALS_JSON")?;
        let service_account = ServiceAccountKey::from_json(&credentials)
            .map_err(|e| DashboardError::Config(format!("FIREBASE_CREDENTIALS_JSON: {e}")))?;

        let timestamp_encoding = env_var_or("TIMESTAMP_ENCODING", "timestamp")
            .parse::<TimestampEncoding>()
            .map_err(|e| DashboardError::Config(format!("TIMESTAMP_ENCODING: {e}")))?;

        let fallback_limit = env_var_or("FALLBACK_LIMIT", "10")
            .parse::<u32>()
            .map_err(|e| DashboardError::Config(format!("FALLBACK_LIMIT: {e}")))?;

        let recent_limit = env_var_or("RECENT_LIMIT", "50")
            .parse::<usize>()
            .map_err(|e| DashboardError::Config(format!("RECENT_LIMIT: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| DashboardError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            service_account,
            firestore_base_url: env_var_or(
                "FIRESTORE_BASE_URL",
                "https://firestore.googleapis.com/v1",
            ),
            collection: env_var_or("FIRESTORE_COLLECTION", "resolved_bets"),
            timestamp_encoding,
            fallback_limit,
            recent_limit,
            static_dir: PathBuf::from(env_var_or("STATIC_DIR", "static")),
            server_port,
        })
    }
}

fn env_var(key: &str) -> DashboardResult<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DashboardError::Config(format!("missing env var: {key}"))),
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

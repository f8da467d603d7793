use super::auth::ServiceAccountAuth;
use super::types::{RunQueryItem, RunQueryRequest};
use super::{DocumentStore, RawDocument, RecordQuery, TimestampEncoding};
use crate::errors::{DashboardError, DashboardResult};
use reqwest::Client;

/// Firestore REST client. All methods return Result, never panic.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    auth: ServiceAccountAuth,
    timestamp_encoding: TimestampEncoding,
}

impl FirestoreStore {
    pub fn new(
        base_url: &str,
        auth: ServiceAccountAuth,
        timestamp_encoding: TimestampEncoding,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            timestamp_encoding,
        }
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents:runQuery",
            self.base_url,
            self.auth.project_id()
        )
    }

    async fn auth_post<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> DashboardResult<T> {
        let token = self.auth.access_token(&self.client).await?;

        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DashboardError::Firestore {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| DashboardError::Parse(format!("POST {url}: {e}")))
    }
}

impl DocumentStore for FirestoreStore {
    async fn run_query(&self, query: &RecordQuery) -> DashboardResult<Vec<RawDocument>> {
        let body = RunQueryRequest::build(query, self.timestamp_encoding);
        let items: Vec<RunQueryItem> = self.auth_post(&self.run_query_url(), &body).await?;

        let docs: Vec<RawDocument> = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| doc.into_raw())
            .collect();

        tracing::debug!(
            collection = %query.collection,
            filters = query.filters.len(),
            count = docs.len(),
            "firestore query returned"
        );
        Ok(docs)
    }
}

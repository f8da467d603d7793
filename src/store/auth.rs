use crate::errors::{DashboardError, DashboardResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::Client;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::Mutex;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The subset of a Google service-account JSON key this service needs.
#[derive(Clone, serde::Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> DashboardResult<Self> {
        let key: Self = serde_json::from_str(raw)?;
        if key.project_id.is_empty() || key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(DashboardError::Auth(
                "service account key needs project_id, client_email and private_key".into(),
            ));
        }
        Ok(key)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Google OAuth2 service-account authenticator.
/// Signs an RS256 JWT assertion and trades it for a bearer token, which is
/// cached and shared by every clone until shortly before it expires.
#[derive(Clone)]
pub struct ServiceAccountAuth {
    project_id: String,
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    signing_key: SigningKey<Sha256>,
    cache: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    pub fn new(key: &ServiceAccountKey) -> DashboardResult<Self> {
        let pem = key.private_key.replace("\\n", "\n");

        // Service-account keys are PKCS#8; accept PKCS#1 too
        let private_key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| DashboardError::Auth(format!("parse RSA PEM: {e}")))?;

        tracing::info!(
            client_email = %key.client_email,
            project = %key.project_id,
            "loaded service account key"
        );

        Ok(Self {
            project_id: key.project_id.clone(),
            client_email: key.client_email.clone(),
            key_id: key.private_key_id.clone(),
            token_uri: key.token_uri.clone(),
            signing_key: SigningKey::<Sha256>::new(private_key),
            cache: Arc::new(Mutex::new(None)),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Build the signed `header.claims.signature` assertion for `now` (unix secs).
    pub fn sign_assertion(&self, now: i64) -> DashboardResult<String> {
        let mut header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
        if let Some(kid) = &self.key_id {
            header["kid"] = serde_json::Value::String(kid.clone());
        }
        let claims = serde_json::json!({
            "iss": self.client_email,
            "scope": DATASTORE_SCOPE,
            "aud": self.token_uri,
            "iat": now,
            "exp": now + ASSERTION_LIFETIME_SECS,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?),
        );
        let signature = self.signing_key.sign(signing_input.as_bytes());

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
    }

    /// Current bearer token, exchanging a fresh assertion when the cached one is stale.
    pub async fn access_token(&self, client: &Client) -> DashboardResult<String> {
        let now = chrono::Utc::now().timestamp();
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = self.sign_assertion(now)?;
        let resp = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DashboardError::Auth(format!("token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DashboardError::Auth(format!("token exchange HTTP {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| DashboardError::Auth(format!("token parse: {e}")))?;

        let expires_at = now + token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        tracing::debug!(expires_at, "refreshed firestore access token");

        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}

//! OAuth2 access tokens for the Firestore REST API.
//!
//! A service account signs a short-lived RS256 JWT and trades it at the key's
//! `token_uri` for a bearer token (the JWT-bearer grant). The token is cached
//! and reused until shortly before it expires. Against the emulator a fixed
//! `owner` token is sent instead and no key material is parsed.

use chrono::{DateTime, Duration, TimeDelta, Utc};
use elh_admin_core::contract::StoreError;
use elh_admin_core::credentials::ServiceAccountKey;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const EMULATOR_TOKEN: &str = "owner";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// When a token issued at `now` expires. Lifetimes chrono cannot represent
/// fall back to the assertion lifetime.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| {
            tracing::warn!(expires_in, "Token lifetime out of range, using default");
            now + Duration::seconds(ASSERTION_LIFETIME_SECS)
        })
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

pub struct ServiceAccountTokens {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

pub enum TokenSource {
    Static(String),
    ServiceAccount(Box<ServiceAccountTokens>),
}

impl TokenSource {
    pub fn emulator() -> Self {
        TokenSource::Static(EMULATOR_TOKEN.to_string())
    }

    /// Parses the key's RSA private key up front so a bad key fails at
    /// client construction, not on the first request.
    pub fn from_service_account(
        key: &ServiceAccountKey,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            tracing::error!(error = %e, client_email = %key.client_email, "Invalid private key in service account file");
            anyhow::anyhow!("Service account private_key is not a valid RSA PEM key: {e}")
        })?;
        Ok(TokenSource::ServiceAccount(Box::new(ServiceAccountTokens {
            http,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            key_id: key.private_key_id.clone(),
            signing_key,
            cached: Mutex::new(None),
        })))
    }

    /// A bearer token valid for at least the refresh margin.
    pub async fn token(&self) -> Result<String, StoreError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount(sa) => sa.token().await,
        }
    }
}

impl ServiceAccountTokens {
    async fn token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = self.sign_assertion(now)?;
        tracing::info!(token_uri = %self.token_uri, client_email = %self.client_email, "Requesting access token");
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token request failed to send");
                format!("token request to {} failed: {e}", self.token_uri)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Token endpoint rejected the service account");
            return Err(format!("token endpoint returned {status}: {body}").into());
        }
        let parsed: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed token response");
            format!("malformed token response: {e}")
        })?;

        let token = CachedToken {
            value: parsed.access_token,
            expires_at: token_expiry(now, parsed.expires_in),
        };
        tracing::debug!(expires_at = %token.expires_at, "Access token cached");
        *cached = Some(token.clone());
        Ok(token.value)
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        encode(&header, &claims, &self.signing_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign JWT assertion");
            format!("failed to sign JWT assertion: {e}").into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emulator_source_always_returns_owner() {
        let source = TokenSource::emulator();
        assert_eq!(source.token().await.unwrap(), "owner");
    }

    #[test]
    fn cached_token_refreshes_inside_margin() {
        let now = Utc::now();
        let fresh = CachedToken {
            value: "t".into(),
            expires_at: now + Duration::seconds(600),
        };
        let stale = CachedToken {
            value: "t".into(),
            expires_at: now + Duration::seconds(REFRESH_MARGIN_SECS - 1),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }

    #[test]
    fn out_of_range_lifetime_falls_back_to_default() {
        let now = Utc::now();
        let fallback = now + Duration::seconds(ASSERTION_LIFETIME_SECS);
        assert_eq!(token_expiry(now, i64::MAX), fallback);
        assert_eq!(token_expiry(now, i64::MIN), fallback);
        assert_eq!(token_expiry(now, 3599), now + Duration::seconds(3599));
    }

    #[test]
    fn rejects_non_pem_private_key() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"project_id":"p","client_email":"a@b.c","private_key":"not a key"}"#,
        )
        .unwrap();
        let result = TokenSource::from_service_account(&key, reqwest::Client::new());
        assert!(result.is_err());
    }
}

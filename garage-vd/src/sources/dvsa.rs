//! DVSA MOT History API client
//!
//! Requests carry an OAuth2 bearer token (client-credentials grant) plus the
//! `x-api-key` header. Tokens are cached until shortly before expiry.

use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{error_for_status, http_client, rate_limiter, Limiter, SourceError};

pub const DVSA_BASE_URL: &str = "https://history.mot.api.gov.uk";
pub const DVSA_DEFAULT_SCOPE: &str = "https://tapi.dvsa.gov.uk/.default";
const RATE_LIMIT_PER_SEC: u32 = 10;

/// Refresh tokens this long before they actually expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// OAuth2 client-credentials configuration
#[derive(Debug, Clone)]
pub struct DvsaCredentials {
    pub api_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// DVSA MOT history client
pub struct DvsaClient {
    http_client: reqwest::Client,
    rate_limiter: Limiter,
    base_url: String,
    credentials: DvsaCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl DvsaClient {
    pub fn new(
        credentials: DvsaCredentials,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: http_client(timeout)?,
            rate_limiter: rate_limiter(RATE_LIMIT_PER_SEC),
            base_url: base_url.unwrap_or_else(|| DVSA_BASE_URL.to_string()),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Current bearer token, fetching a new one when missing or expiring
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!("Requesting DVSA access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.credentials.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    /// MOT test history for a registration; `None` when DVSA has no record
    pub async fn mot_history(&self, registration: &str) -> Result<Option<Value>, SourceError> {
        let token = self.access_token().await?;
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/v1/trade/vehicles/registration/{}",
            self.base_url.trim_end_matches('/'),
            registration
        );
        tracing::debug!(registration = %registration, "Querying DVSA MOT history");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .header("x-api-key", &self.credentials.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(registration = %registration, "DVSA has no MOT history");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let history: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(Some(history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_default_expiry() {
        let token: TokenResponse =
            serde_json::from_value(json!({"access_token": "abc", "token_type": "Bearer"})).unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_cached_token_reused_until_expiry() {
        let credentials = DvsaCredentials {
            api_key: "key".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            // Unroutable: a token request here would fail the test
            token_url: "http://127.0.0.1:9/token".into(),
            scope: DVSA_DEFAULT_SCOPE.into(),
        };
        let client = DvsaClient::new(credentials, None, Duration::from_secs(1)).unwrap();
        *client.token.lock().await = Some(CachedToken {
            access_token: "cached".into(),
            expires_at: Instant::now() + Duration::from_secs(600),
        });

        assert_eq!(client.access_token().await.unwrap(), "cached");
    }
}

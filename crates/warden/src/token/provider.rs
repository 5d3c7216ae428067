//! Token provider client.
//!
//! The provider is any reCAPTCHA-compatible issuance service reachable by
//! site key + action name, returning a short-lived opaque token string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use aegis_common::AegisError;

/// Upstream token issuance service
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Request a token for the given site key and action name
    async fn issue(&self, site_key: &str, action: &str) -> Result<String, AegisError>;
}

/// HTTP implementation of [`TokenProvider`]
pub struct HttpTokenProvider {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct IssueRequest<'a> {
    site_key: &'a str,
    action: &'a str,
}

#[derive(Deserialize)]
struct IssueResponse {
    token: String,
}

impl HttpTokenProvider {
    pub fn new(endpoint: String, timeout_secs: u64) -> Result<Self, AegisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AegisError::Internal(format!("http client: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn issue(&self, site_key: &str, action: &str) -> Result<String, AegisError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&IssueRequest { site_key, action })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AegisError::Timeout(format!("provider request: {e}"))
                } else {
                    AegisError::Provider(format!("network: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(AegisError::Provider(format!(
                "http: status {}",
                response.status()
            )));
        }

        let body: IssueResponse = response
            .json()
            .await
            .map_err(|e| AegisError::Provider(format!("decode: {e}")))?;

        if body.token.is_empty() {
            return Err(AegisError::Provider(
                "provider returned an empty token".to_string(),
            ));
        }

        Ok(body.token)
    }
}

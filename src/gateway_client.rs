use crate::errors::AppError;
use reqwest;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing;

/// Client for the BBPS aggregator's JSON endpoints.
///
/// Speaks the same contract to the aggregator itself and to this service's
/// own `/api/bbps` proxy, so it is also what a browser-side caller uses.
#[derive(Clone)]
pub struct BbpsGatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BbpsGatewayClient {
    /// Creates a new `BbpsGatewayClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL the endpoint paths are appended to.
    /// * `api_key` - Optional key sent as `x-api-key`.
    /// * `timeout` - Request timeout; `None` keeps reqwest's default (no timeout).
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create BBPS client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts `body` to `path` and returns the JSON response.
    ///
    /// # Arguments
    ///
    /// * `path` - Endpoint path, starting with `/`.
    /// * `body` - Request payload.
    ///
    /// # Returns
    ///
    /// * `Result<Value, AppError>` - The parsed body on 2xx, `AppError::Upstream`
    ///   carrying the status and body otherwise, `AppError::ExternalApiError` on
    ///   transport or parse failures.
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value, AppError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("BBPS request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to read BBPS response: {}", e))
        })?;

        if !status.is_success() {
            tracing::warn!("BBPS {} returned {}: {}", path, status, text);
            // Non-JSON error pages are carried as plain strings
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse BBPS response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = BbpsGatewayClient::new("https://example.com/".to_string(), None, None);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "https://example.com");
    }
}

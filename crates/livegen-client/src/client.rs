//! HTTP client for the generation endpoint.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;

use crate::error::GenerationClientError;
use crate::streaming::StreamingResponse;
use crate::types::GenerationRequest;

/// Client for a streaming code-generation endpoint.
#[derive(Clone)]
pub struct Client {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// Full URL of the generation endpoint
    endpoint: Url,
}

impl Client {
    /// Create a client for the given endpoint URL.
    ///
    /// # Example
    /// ```rust,no_run
    /// use livegen_client::Client;
    ///
    /// # fn example() -> Result<(), livegen_client::GenerationClientError> {
    /// let client = Client::new("http://localhost:3000/api/generate")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(endpoint: &str) -> Result<Self, GenerationClientError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationClientError::Config(e.to_string()))?;
        Self::with_http_client(http_client, endpoint)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_http_client(
        http_client: reqwest::Client,
        endpoint: &str,
    ) -> Result<Self, GenerationClientError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            GenerationClientError::Config(format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(GenerationClientError::Config(format!(
                "endpoint must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// Send a generation request and return the streamed response.
    ///
    /// Fails with `Connectivity` if the request could not be delivered and with `Status`
    /// if the server answered with a non-success status.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<StreamingResponse, GenerationClientError> {
        tracing::info!(
            "Client::generate - mode={} history={} endpoint={}",
            request.mode.as_str(),
            request.chat_history.len(),
            self.endpoint
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .headers(Self::build_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Client::generate - request failed: {}", e);
                GenerationClientError::Connectivity(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Client::generate - status {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            );
            return Err(GenerationClientError::from_status(status.as_u16(), &body));
        }

        Ok(StreamingResponse::new(response))
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = Client::new("not a url").unwrap_err();
        assert_eq!(err.kind(), "config");

        let err = Client::new("ftp://example.com/gen").unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_accepts_http_endpoint() {
        let client = Client::new("http://127.0.0.1:3000/api/generate").unwrap();
        assert_eq!(client.endpoint().path(), "/api/generate");
    }
}

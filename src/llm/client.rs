//! OpenAI-compatible API client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::{ApiErrorBody, ChatRequest, ChatResponse};
use crate::config::DEFAULT_BASE_URL;
use crate::error::ProviderError;

/// One reasoning call to a language-model provider.
///
/// The credential travels with each call: agents carry their own key, while
/// the client itself holds no per-agent state.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Cheap capability check for a credential
    async fn probe(&self, api_key: &str) -> Result<(), ProviderError>;

    /// Issue exactly one completion request
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError>;
}

/// Chat completions client over HTTP
pub struct OpenAiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client for the given API base (e.g. `https://api.openai.com/v1`).
    ///
    /// No request timeout is configured: a stalled provider blocks the
    /// calling loop until the connection fails.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build headers for API requests
    fn headers(&self, api_key: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
            ProviderError::Api {
                status: 401,
                message: "provider key contains invalid header characters".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&error_text) {
            Ok(body) => body.error.message,
            Err(_) => error_text,
        };
        Err(ProviderError::Api { status, message })
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn probe(&self, api_key: &str) -> Result<(), ProviderError> {
        let response = self
            .http_client
            .get(format!("{}/models", self.base_url))
            .headers(self.headers(api_key)?)
            .send()
            .await?;

        Self::check_status(response).await?;
        debug!("Credential probe succeeded against {}", self.base_url);
        Ok(())
    }

    async fn complete(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers(api_key)?)
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

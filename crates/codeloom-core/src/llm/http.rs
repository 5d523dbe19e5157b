use futures::StreamExt;
use std::time::Duration;

use crate::config::Settings;
use crate::error::LoomError;
use crate::llm::traits::*;

/// Streams generations from the hosted endpoint over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut transport = Self::new(settings.endpoint_url());
        transport.api_key = settings.api_key();
        transport
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Time limit for the whole call, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl GenerationTransport for HttpTransport {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, LoomError> {
        let mut builder = self
            .client
            .post(&self.url)
            .header("accept", "text/event-stream")
            .json(request);
        if let Some(ref api_key) = self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LoomError::transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Generation endpoint rejected request");
            return Err(LoomError::transport(format!(
                "generation endpoint error ({status}): {text}"
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| LoomError::transport(format!("stream read failed: {e}")))
            })
            .boxed())
    }
}

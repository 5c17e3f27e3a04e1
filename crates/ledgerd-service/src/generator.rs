//! Image generator backend client.
//!
//! The ledger charges credits before calling out to the generation backend;
//! the trait seam keeps that orchestration testable without a live backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors from the image generator backend.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The HTTP request itself failed.
    #[error("generator request failed: {0}")]
    Request(String),

    /// The backend returned a non-success status.
    #[error("generator returned {status}: {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },
}

/// A successfully generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// URL of the generated image.
    pub url: String,

    /// The model that produced it.
    pub model: String,
}

/// An image generation backend.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Run an image edit on the backend.
    async fn edit(
        &self,
        model: &str,
        prompt: &str,
        image_url: Option<&str>,
    ) -> Result<GeneratedImage, GeneratorError>;
}

/// Request body sent to the generation backend.
#[derive(Debug, Serialize)]
struct EditRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

/// Response body from the generation backend.
#[derive(Debug, Deserialize)]
struct EditResponse {
    url: String,
}

/// HTTP client for the image generation backend.
pub struct HttpImageGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpImageGenerator {
    /// Create a new client for the given backend URL.
    #[must_use]
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn edit(
        &self,
        model: &str,
        prompt: &str,
        image_url: Option<&str>,
    ) -> Result<GeneratedImage, GeneratorError> {
        let url = format!("{}/v1/images/edits", self.base_url);

        let mut request = self.client.post(&url).json(&EditRequest {
            model,
            prompt,
            image_url,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GeneratorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body: EditResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Request(e.to_string()))?;

        Ok(GeneratedImage {
            url: body.url,
            model: model.to_string(),
        })
    }
}

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};

/// A text-in, text-out completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn model(&self) -> &str;
}

/// Client for a locally running Ollama server. Calls block until the model
/// answers; no timeout is applied.
pub struct OllamaLlm {
    base_url: String,
    model: String,
    http: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaLlm {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|err| classify_request_error(&self.base_url, err, RagError::Generation))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::ModelUnavailable {
                model: self.model.clone(),
                reason: body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;
        debug!(answer_chars = parsed.response.len(), "completion received");
        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Connection failures mean the service is not running; anything else that
/// fails before a response arrives is reported as-is.
pub(crate) fn classify_request_error(
    endpoint: &str,
    err: reqwest::Error,
    otherwise: fn(String) -> RagError,
) -> RagError {
    if err.is_connect() {
        RagError::ServiceUnreachable {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    } else {
        otherwise(err.to_string())
    }
}

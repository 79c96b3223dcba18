//! Text-generation backend for the model-backed decider
//!
//! Production uses a local Ollama server (`POST /api/generate`, non-streaming,
//! JSON format). The HTTP client is blocking and created on first use so that
//! constructing an `OllamaModel` inside an async context is safe.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::config::DeciderConfig;
use crate::error::{CallbotError, Result};

/// Anything that turns a prompt into raw model text
pub trait DecisionModel: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug)]
pub struct OllamaModel {
    endpoint: String,
    model: String,
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

impl OllamaModel {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
            client: OnceLock::new(),
        }
    }

    pub fn from_config(config: &DeciderConfig) -> Self {
        Self::new(
            &config.model_endpoint,
            &config.model_name,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| CallbotError::Model(format!("client init failed: {e}")))?;
        // A concurrent caller may have won the race; either client is fine.
        let _ = self.client.set(client);
        self.client
            .get()
            .ok_or_else(|| CallbotError::Model("client unavailable".into()))
    }
}

impl DecisionModel for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: 128,
            },
        };

        debug!(%url, model = %self.model, "requesting decision from model");
        let response = self
            .client()?
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| CallbotError::Model(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallbotError::Model(format!("{url} returned {status}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| CallbotError::Model(format!("unreadable response body: {e}")))?;
        Ok(parsed.response)
    }
}

//! Local model engine (Ollama `/api/generate`)

use async_trait::async_trait;
use ojt_core::GenerationConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::engine::{GenerationEngine, GenerationRequest};
use crate::prompt::build_prompt;
use crate::{GenerationError, Result};

const DEFAULT_BASE_URL: &str = "http://localhost:11434/";

/// Engine backed by a model served on the local machine
#[derive(Debug)]
pub struct LocalEngine {
    http: Client,
    base_url: Url,
    model: String,
    name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LocalEngine {
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            http: http_client(None)?,
            base_url,
            name: format!("local:{}", model),
            model,
            temperature: 0.7,
            max_tokens: 8192,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Self::new(base_url, config.model.clone())?
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout(config.timeout())
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http_client(Some(timeout))?;
        Ok(self)
    }
}

fn http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder =
        Client::builder().user_agent(format!("ojt-generation/{}", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[async_trait]
impl GenerationEngine for LocalEngine {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request, cancel), fields(model = %self.model, step = request.step))]
    async fn generate(&self, request: &GenerationRequest, cancel: &CancellationToken) -> Result<String> {
        let body = OllamaRequest {
            model: &self.model,
            prompt: build_prompt(request),
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let call = async {
            let response = self
                .http
                .post(self.base_url.join("api/generate")?)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(GenerationError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let parsed: OllamaResponse = response.json().await?;
            Ok(parsed)
        };

        let parsed = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            parsed = call => parsed?,
        };

        if parsed.response.trim().is_empty() {
            return Err(GenerationError::EmptyResponse(
                "local model returned an empty response".to_string(),
            ));
        }

        debug!(chars = parsed.response.len(), "Local generation finished");
        Ok(parsed.response)
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

//! Hosted model engine (Gemini `generateContent` API)

use async_trait::async_trait;
use ojt_core::GenerationConfig;
use reqwest::{header, Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::engine::{GenerationEngine, GenerationRequest};
use crate::prompt::build_prompt;
use crate::{GenerationError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Engine backed by a hosted model
pub struct CloudEngine {
    http: Client,
    base_url: Url,
    model: String,
    name: String,
    api_key: Option<Secret<String>>,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for CloudEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudEngine")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Builder for creating a CloudEngine
#[derive(Default)]
pub struct CloudEngineBuilder {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
}

impl CloudEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Transport timeout. The generation deadline is enforced separately.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<CloudEngine> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&with_trailing_slash(&base_url))?;
        let model = self.model.unwrap_or_else(|| "gemini-1.5-flash".to_string());

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
            .user_agent(format!("ojt-generation/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(CloudEngine {
            http,
            base_url,
            name: format!("cloud:{}", model),
            model,
            api_key: self.api_key.map(Secret::new),
            temperature: self.temperature.unwrap_or(0.7),
            max_tokens: self.max_tokens.unwrap_or(8192),
        })
    }
}

impl CloudEngine {
    pub fn builder() -> CloudEngineBuilder {
        CloudEngineBuilder::new()
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .model(config.model.clone())
            .api_key(Some(config.api_key.clone()))
            .temperature(config.temperature)
            .max_tokens(config.max_tokens)
            .timeout(config.timeout());
        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url.clone());
        }
        builder.build()
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(GenerationError::Url)
    }

    async fn handle_response(&self, response: Response) -> Result<GenerateContentResponse> {
        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(GenerationError::Http);
        }

        let error_body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GenerationError::Auth(error_body)),
            StatusCode::TOO_MANY_REQUESTS => Err(GenerationError::RateLimit),
            _ => Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_body,
            }),
        }
    }
}

#[async_trait]
impl GenerationEngine for CloudEngine {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request, cancel), fields(model = %self.model, step = request.step))]
    async fn generate(&self, request: &GenerationRequest, cancel: &CancellationToken) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| GenerationError::Auth("no API key configured".to_string()))?;

        let body = GenerateContentRequest {
            contents: vec![ContentBody {
                parts: vec![PartBody {
                    text: build_prompt(request),
                }],
            }],
            generation_config: GenerationSettings {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
                response_mime_type: "application/json",
            },
        };

        let call = async {
            let response = self
                .http
                .post(self.endpoint()?)
                .header("x-goog-api-key", api_key.expose_secret())
                .json(&body)
                .send()
                .await?;
            self.handle_response(response).await
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            response = call => response?,
        };

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::EmptyResponse("empty candidate list".to_string()))?;

        debug!(chars = text.len(), "Cloud generation finished");
        Ok(text)
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ContentBody>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct ContentBody {
    parts: Vec<PartBody>,
}

#[derive(Debug, Serialize)]
struct PartBody {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine(server: &MockServer) -> CloudEngine {
        CloudEngine::builder()
            .base_url(server.uri())
            .model("test-model")
            .api_key(Some("secret-key".to_string()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_reads_first_candidate() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "secret-key"))
            .and(body_partial_json(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "{\"title\":"}, {"text": "\"T\"}"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = engine(&server)
            .generate(&GenerationRequest::new("text", "T"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(text, "{\"title\":\"T\"}");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = engine(&server)
            .generate(&GenerationRequest::new("text", "T"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = engine(&server)
            .generate(&GenerationRequest::new("text", "T"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::RateLimit));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let engine = CloudEngine::builder().api_key(Some(String::new())).build().unwrap();
        let err = engine
            .generate(&GenerationRequest::new("text", "T"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Auth(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let engine = CloudEngine::builder()
            .api_key(Some("top-secret".to_string()))
            .build()
            .unwrap();
        let debug = format!("{:?}", engine);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("top-secret"));
    }
}

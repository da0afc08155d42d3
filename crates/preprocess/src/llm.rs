use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::{PreprocessError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Anything that can answer a system instruction plus one user turn with text.
pub trait CompletionClient {
    fn complete(&self, system: &str, user: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            api_key,
            temperature: 0.0,
            client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Build a client from `GOOGLE_API_KEY`. A missing key is logged, not
    /// fatal: every call made with this client will fail instead.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty());

        match &api_key {
            Some(_) => tracing::info!(var = API_KEY_VAR, "Gemini API key loaded"),
            None => tracing::error!(var = API_KEY_VAR, "Failed to load Gemini API key from environment"),
        }

        Self::new(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Bound every request to the completion service by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PreprocessError::Configuration(format!("{} is not set", API_KEY_VAR))
        })?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![TextPart { text: system.to_string() }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![TextPart { text: user.to_string() }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self.client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PreprocessError::Transport(format!(
                "Gemini request failed: {} - {}",
                status, body
            )));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        if let Some(error) = gemini_response.error {
            return Err(PreprocessError::Transport(format!("Gemini error: {}", error.message)));
        }

        let text: String = gemini_response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(PreprocessError::Transport(
                "Gemini returned no candidates".to_string(),
            ));
        }

        Ok(text)
    }
}

fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl CompletionClient for GeminiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.generate(system, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-1.5-flash:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(Some("test-key".to_string()), DEFAULT_MODEL.to_string())
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_sends_system_and_user_turns() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": {"parts": [{"text": "be terse"}]},
                "contents": [{"role": "user", "parts": [{"text": "fly to Fresno"}]}],
                "generationConfig": {"temperature": 0.0}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "{\"query_type\": "}, {"text": "\"flight\"}"}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).complete("be terse", "fly to Fresno").await.unwrap();
        assert_eq!(text, r#"{"query_type": "flight"}"#);
    }

    #[tokio::test]
    async fn test_http_error_is_transport() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("system", "query").await.unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_transport() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("system", "query").await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_missing_key_never_hits_network() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(None, DEFAULT_MODEL.to_string()).with_base_url(server.uri());
        let err = client.complete("system", "query").await.unwrap_err();

        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains(API_KEY_VAR));
        assert!(!client.has_credential());
    }
}

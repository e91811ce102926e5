use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{QuizGeneratorError, Result};
use crate::models::GeminiRequest;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Sends a prompt to the generative provider and hands back the raw response body.
///
/// One attempt per call. Retrying is left to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String>;
}

pub struct GeminiTransport {
    client: Client,
    endpoint: String,
}

impl GeminiTransport {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuizGeneratorError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: Self::endpoint_for(base_url, model),
        })
    }

    pub fn from_config(cfg: &GeminiConfig) -> Result<Self> {
        Self::new(&cfg.base_url, &cfg.model, cfg.timeout())
    }

    fn endpoint_for(base_url: &str, model: &str) -> String {
        format!(
            "{}/v1/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        tracing::info!("Requesting generation from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&GeminiRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach Gemini API: {e}");
                QuizGeneratorError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = status.as_u16(), "Gemini API rejected the request");
            return Err(QuizGeneratorError::RemoteRejection {
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| {
            QuizGeneratorError::Transport(format!("Failed to read Gemini API response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> GeminiTransport {
        GeminiTransport::new(&server.uri(), "gemini-2.0-flash", Duration::from_secs(5))
            .expect("client should build")
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        assert_eq!(
            GeminiTransport::endpoint_for("https://example.com/", "m-1"),
            "https://example.com/v1/models/m-1:generateContent"
        );
        assert_eq!(
            GeminiTransport::endpoint_for("https://example.com", "m-1"),
            "https://example.com/v1/models/m-1:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "secret"))
            .and(body_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "make a quiz"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"candidates\":[]}"))
            .expect(1)
            .mount(&server)
            .await;

        let body = transport_for(&server)
            .generate("secret", "make a quiz")
            .await
            .expect("request should succeed");
        assert_eq!(body, "{\"candidates\":[]}");
    }

    #[tokio::test]
    async fn test_generate_reports_rejection_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .generate("secret", "prompt")
            .await
            .unwrap_err();
        match err {
            QuizGeneratorError::RemoteRejection { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_transport_error() {
        // Nothing listens on this port
        let transport =
            GeminiTransport::new("http://127.0.0.1:9", "m", Duration::from_secs(2)).unwrap();
        let err = transport.generate("k", "p").await.unwrap_err();
        assert!(matches!(err, QuizGeneratorError::Transport(_)));
        assert!(err.is_remote());
    }
}

use std::sync::Arc;

use crate::error::QuizGeneratorError;
use crate::extract::extract;
use crate::models::{FailureKind, GenerationResult, QuizRequest};
use crate::parser::parse;
use crate::prompt::build_prompt;
use crate::transport::Transport;

/// Runs prompt -> request -> extraction -> parsing for one quiz request
pub struct QuizGenerator {
    tx: Arc<dyn Transport>,
    api_key: String,
}

impl QuizGenerator {
    pub fn new(tx: Arc<dyn Transport>, api_key: String) -> Self {
        Self { tx, api_key }
    }

    /// Every failure along the way comes back as `GenerationResult::Failure`
    pub async fn generate(&self, request: &QuizRequest) -> GenerationResult {
        tracing::info!(
            "Generating {} {} questions about {:?} in {}",
            request.count,
            request.question_type,
            request.topic,
            request.language
        );

        let prompt = build_prompt(
            &request.topic,
            request.difficulty,
            request.question_type,
            &request.language,
            &request.count,
        );

        let raw_body = match self.tx.generate(&self.api_key, &prompt).await {
            Ok(body) => body,
            Err(e) => return remote_failure(e),
        };

        let candidate = match extract(&raw_body) {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::warn!("{} - API response: {}", e, raw_body);
                return GenerationResult::Failure {
                    kind: FailureKind::Extraction,
                    reason: None,
                };
            }
        };

        let result = parse(&candidate);
        match &result {
            GenerationResult::Success { questions } => {
                tracing::info!("Generated {} questions", questions.len());
            }
            GenerationResult::Failure { kind, reason } => {
                tracing::warn!("Generation failed ({:?}): {:?}", kind, reason);
            }
        }
        result
    }
}

fn remote_failure(e: QuizGeneratorError) -> GenerationResult {
    let kind = match e {
        QuizGeneratorError::RemoteRejection { .. } => FailureKind::RemoteRejection,
        _ => FailureKind::Transport,
    };
    tracing::error!("Generation request failed: {}", e);
    GenerationResult::failure(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{Difficulty, QuestionType};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    // Mock Transport for testing
    struct MockTransport {
        responses: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<String>>) -> Self {
            MockTransport {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn generate(&self, _api_key: &str, prompt: &str) -> Result<String> {
            self.prompts
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .push(prompt.to_string());
            let mut responses = self
                .responses
                .lock()
                .expect("Mock transport mutex should not be poisoned");
            responses.pop().unwrap_or_else(|| {
                Err(QuizGeneratorError::Internal(
                    "No more mock responses".to_string(),
                ))
            })
        }
    }

    fn envelope(text: &str) -> String {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
    }

    fn request() -> QuizRequest {
        QuizRequest::new(
            "Planets",
            Difficulty::Easy,
            QuestionType::TrueFalse,
            "English",
            "1",
            250,
        )
        .expect("valid request")
    }

    #[tokio::test]
    async fn test_generate_success_through_fenced_output() {
        let text = "```json\n{\"success\":\"true\",\"error\":\"\",\"questions\":[{\"question\":\"Mars is red\",\"options\":[\"A) True\",\"B) False\"],\"correct_option\":\"A) True\"}]}\n```";
        let tx = Arc::new(MockTransport::new(vec![Ok(envelope(text))]));
        let generator = QuizGenerator::new(tx.clone(), "key".to_string());

        let result = generator.generate(&request()).await;
        assert!(result.is_success());
        assert_eq!(result.questions()[0].text, "Mars is red");

        let prompts = tx.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"Planets\""));
        assert!(prompts[0].contains("exactly 1 True/False questions"));
    }

    #[tokio::test]
    async fn test_generate_content_policy_reason_is_verbatim() {
        let text = "{\"success\":\"false\",\"error\":\"Topic contains inappropriate content or is irrelevant.\"}";
        let tx = Arc::new(MockTransport::new(vec![Ok(envelope(text))]));
        let result = QuizGenerator::new(tx, "key".into()).generate(&request()).await;
        assert_eq!(result.kind(), Some(FailureKind::ContentPolicy));
        assert_eq!(
            result.user_message().as_deref(),
            Some("Topic contains inappropriate content or is irrelevant.")
        );
    }

    #[tokio::test]
    async fn test_generate_maps_remote_errors() {
        let tx = Arc::new(MockTransport::new(vec![Err(
            QuizGeneratorError::RemoteRejection {
                status: 403,
                body: "API key not valid".to_string(),
            },
        )]));
        let result = QuizGenerator::new(tx, "key".into()).generate(&request()).await;
        assert_eq!(result.kind(), Some(FailureKind::RemoteRejection));
        let reason = result.reason().unwrap();
        assert!(reason.contains("403"));
        assert!(reason.contains("API key not valid"));

        let tx = Arc::new(MockTransport::new(vec![Err(QuizGeneratorError::Transport(
            "connection reset".to_string(),
        ))]));
        let result = QuizGenerator::new(tx, "key".into()).generate(&request()).await;
        assert_eq!(result.kind(), Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn test_generate_envelope_violation_is_generic_failure() {
        let body = json!({"error": {"code": 429, "message": "Resource exhausted"}}).to_string();
        let tx = Arc::new(MockTransport::new(vec![Ok(body)]));
        let result = QuizGenerator::new(tx, "key".into()).generate(&request()).await;
        assert_eq!(
            result,
            GenerationResult::Failure {
                kind: FailureKind::Extraction,
                reason: None
            }
        );
        assert_eq!(
            result.user_message().as_deref(),
            Some("An unknown error occurred.")
        );
    }

    #[tokio::test]
    async fn test_generate_malformed_model_json() {
        let tx = Arc::new(MockTransport::new(vec![Ok(envelope("{\"success\": \"true\", "))]));
        let result = QuizGenerator::new(tx, "key".into()).generate(&request()).await;
        assert_eq!(result.kind(), Some(FailureKind::Parse));
        assert!(result.reason().unwrap().starts_with("JSON parse error"));
    }
}

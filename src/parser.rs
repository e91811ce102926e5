use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{FailureKind, GenerationResult, ModelOutputHeader, ModelQuestion, Question};

/// Turns candidate JSON into a `GenerationResult`. Never fails; every problem becomes a `Failure`.
pub fn parse(candidate_json: &str) -> GenerationResult {
    match try_parse(candidate_json) {
        Ok(result) => result,
        Err(e) => {
            debug!("Model output rejected: {}", e);
            GenerationResult::failure(FailureKind::Parse, format!("JSON parse error: {e}"))
        }
    }
}

fn try_parse(candidate_json: &str) -> Result<GenerationResult, serde_json::Error> {
    let value: Value = serde_json::from_str(candidate_json)?;
    let Value::Object(mut object) = value else {
        return Err(serde::de::Error::custom(
            "expected a JSON object at the top level",
        ));
    };

    let header: ModelOutputHeader = serde_json::from_value(Value::Object(object.clone()))?;
    let error = Some(header.error).filter(|e| !e.trim().is_empty());

    if header.success != "true" {
        warn!("Model declined to generate questions: {:?}", error);
        return Ok(GenerationResult::Failure {
            kind: FailureKind::ContentPolicy,
            reason: error,
        });
    }

    let raw_questions = object
        .remove("questions")
        .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("questions"))?;
    let questions: Vec<ModelQuestion> = serde_json::from_value(raw_questions)?;

    let questions: Vec<Question> = questions.into_iter().map(Question::from).collect();
    for (i, q) in questions.iter().enumerate() {
        if !q.has_valid_answer() {
            warn!(
                "Question {} has a correct option that is not among its options: {:?}",
                i + 1,
                q.answer
            );
        }
    }
    debug!("Parsed {} questions", questions.len());

    Ok(GenerationResult::Success { questions })
}

use crate::error::{QuizGeneratorError, Result};
use crate::models::GeminiResponse;

/// Pulls the model's text out of the provider envelope and cleans it into candidate JSON.
///
/// Only the first candidate and its first part are read.
pub fn extract(raw_body: &str) -> Result<String> {
    let response: GeminiResponse = serde_json::from_str(raw_body).map_err(|e| {
        QuizGeneratorError::Extraction(format!("API response is not a valid envelope: {e}"))
    })?;

    let candidates = response.candidates.ok_or_else(|| {
        QuizGeneratorError::Extraction("API response does not contain 'candidates' field!".into())
    })?;
    let candidate = candidates.into_iter().next().ok_or_else(|| {
        QuizGeneratorError::Extraction("API response contains no candidates!".into())
    })?;
    let content = candidate.content.ok_or_else(|| {
        QuizGeneratorError::Extraction("API response does not contain 'content' field!".into())
    })?;
    let parts = content.parts.ok_or_else(|| {
        QuizGeneratorError::Extraction("API response does not contain 'parts' field!".into())
    })?;
    let text = parts
        .into_iter()
        .next()
        .and_then(|part| part.text)
        .unwrap_or_default();
    if text.is_empty() {
        return Err(QuizGeneratorError::Extraction(
            "Extracted text content is empty!".into(),
        ));
    }
    tracing::debug!("Extracted model text ({} bytes)", text.len());

    let cleaned = strip_code_fences(&text);
    if !cleaned.starts_with('{') {
        return Err(QuizGeneratorError::Extraction(
            "Extracted content is not a valid JSON object!".into(),
        ));
    }

    Ok(cleaned)
}

/// Removes every "```json" and "```" marker, then trims surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [
                {"content": {"parts": [{"text": text}], "role": "model"}, "finishReason": "STOP"}
            ],
            "modelVersion": "gemini-2.0-flash"
        })
        .to_string()
    }

    #[test]
    fn test_extract_plain_text() {
        let out = extract(&envelope("{\"success\":\"true\"}")).unwrap();
        assert_eq!(out, "{\"success\":\"true\"}");
    }

    #[test]
    fn test_extract_strips_fences_and_whitespace() {
        let text = "```json\n{\"success\":\"false\",\"error\":\"no\"}\n```\n";
        let out = extract(&envelope(text)).unwrap();
        assert_eq!(out, "{\"success\":\"false\",\"error\":\"no\"}");

        let bare = "  ```\n{\"a\":1}\n```  ";
        assert_eq!(extract(&envelope(bare)).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_extract_ignores_extra_candidates_and_parts() {
        let body = json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"first\":true}"}, {"text": "{\"second\":true}"}]}},
                {"content": {"parts": [{"text": "{\"other\":true}"}]}}
            ]
        })
        .to_string();
        assert_eq!(extract(&body).unwrap(), "{\"first\":true}");
    }

    #[test]
    fn test_extract_missing_fields_fail() {
        let cases = [
            json!({"error": {"code": 429, "message": "quota"}}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
            json!({"candidates": [{"content": {"role": "model"}}]}),
            json!({"candidates": [{"content": {"parts": [{"text": ""}]}}]}),
            json!({"candidates": []}),
        ];
        for body in cases {
            let err = extract(&body.to_string()).unwrap_err();
            assert!(matches!(err, QuizGeneratorError::Extraction(_)), "{body}");
        }
    }

    #[test]
    fn test_extract_rejects_non_object_text() {
        let err = extract(&envelope("Sure! Here are your questions.")).unwrap_err();
        assert!(err.to_string().contains("not a valid JSON object"));
    }

    #[test]
    fn test_extract_rejects_non_json_body() {
        assert!(matches!(
            extract("<html>502 Bad Gateway</html>"),
            Err(QuizGeneratorError::Extraction(_))
        ));
    }
}

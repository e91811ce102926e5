use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::QuizGeneratorError;

/// Current wall-clock time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A single quiz question. `id` is 0 until the question is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub choices: Vec<String>,
    pub answer: String,
    pub created_at: i64,
}

impl Question {
    pub fn new(text: String, choices: Vec<String>, answer: String) -> Self {
        Self {
            id: 0,
            text,
            choices,
            answer,
            created_at: now_millis(),
        }
    }

    /// True when the answer is one of the choices
    pub fn has_valid_answer(&self) -> bool {
        self.choices.iter().any(|c| c == &self.answer)
    }

    pub fn is_correct(&self, selected: &str) -> bool {
        self.answer == selected
    }
}

/// A generated quiz kept as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub topic: String,
    pub questions: Vec<Question>,
    pub created_at: i64,
}

impl Quiz {
    pub fn new(topic: String, questions: Vec<Question>) -> Self {
        Self {
            id: 0,
            topic,
            questions,
            created_at: now_millis(),
        }
    }
}

/// Which stage of the generation pipeline produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    RemoteRejection,
    Extraction,
    /// The model declined the topic
    ContentPolicy,
    Parse,
}

/// Outcome of one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success { questions: Vec<Question> },
    Failure {
        kind: FailureKind,
        reason: Option<String>,
    },
}

impl GenerationResult {
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        GenerationResult::Failure {
            kind,
            reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }

    /// Generated questions; empty for a failure
    pub fn questions(&self) -> &[Question] {
        match self {
            GenerationResult::Success { questions } => questions,
            GenerationResult::Failure { .. } => &[],
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            GenerationResult::Success { .. } => None,
            GenerationResult::Failure { reason, .. } => reason.as_deref(),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            GenerationResult::Success { .. } => None,
            GenerationResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Text shown to the user for a failed generation
    pub fn user_message(&self) -> Option<String> {
        let GenerationResult::Failure { kind, reason } = self else {
            return None;
        };
        let message = match (kind, reason) {
            (FailureKind::ContentPolicy, Some(reason)) => reason.clone(),
            (FailureKind::Extraction, _) | (_, None) => "An unknown error occurred.".to_string(),
            (_, Some(reason)) => format!("An unexpected error occurred: {reason}"),
        };
        Some(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// English label used inside prompts
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    /// Accepts English and Turkish labels
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "easy" | "kolay" => Ok(Difficulty::Easy),
            "medium" | "orta" => Ok(Difficulty::Medium),
            "hard" | "zor" => Ok(Difficulty::Hard),
            _ => Err(format!("Unknown difficulty '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    TrueFalse,
}

impl QuestionType {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "Multiple Choice",
            QuestionType::TrueFalse => "True/False",
        }
    }

    pub fn options_per_question(&self) -> usize {
        match self {
            QuestionType::MultipleChoice => 4,
            QuestionType::TrueFalse => 2,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    /// Labels are localized, so match on the normalized meaning rather than exact text
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "multiplechoice" | "mc" | "coktansecmeli" => Ok(QuestionType::MultipleChoice),
            "truefalse" | "tf" | "dogruyanlis" => Ok(QuestionType::TrueFalse),
            _ => Err(format!("Unknown question type '{s}'")),
        }
    }
}

/// Lowercases, folds Turkish letters to ASCII and drops everything that is not alphanumeric
fn normalize_label(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' => 'u',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Parameters a caller supplies to start a generation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    pub language: String,
    pub count: String,
}

impl QuizRequest {
    /// Trims the topic and caps it at `max_topic_length` characters; the count must be digits
    pub fn new(
        topic: &str,
        difficulty: Difficulty,
        question_type: QuestionType,
        language: &str,
        count: &str,
        max_topic_length: usize,
    ) -> Result<Self, QuizGeneratorError> {
        let topic: String = topic.trim().chars().take(max_topic_length).collect();
        if topic.is_empty() {
            return Err(QuizGeneratorError::Validation(
                "Topic cannot be empty".to_string(),
            ));
        }
        let count = count.trim();
        let valid_count = !count.is_empty()
            && count.chars().all(|c| c.is_ascii_digit())
            && count.parse::<u32>().is_ok_and(|n| n > 0);
        if !valid_count {
            return Err(QuizGeneratorError::Validation(format!(
                "Question count must be a positive number, got '{count}'"
            )));
        }
        let language = language.trim();
        if language.is_empty() {
            return Err(QuizGeneratorError::Validation(
                "Language cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            topic,
            difficulty,
            question_type,
            language: language.to_string(),
            count: count.to_string(),
        })
    }
}

/// Order for lists of saved records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortingOption {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortingOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(SortingOption::Newest),
            "oldest" => Ok(SortingOption::Oldest),
            other => Err(format!("Unknown sorting option '{other}'")),
        }
    }
}

// Gemini request envelope
#[derive(Debug, Serialize, Clone)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    /// Single user turn carrying the prompt
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: Some(vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }]),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: Option<String>,
}

// Gemini response envelope; every level is optional so a missing field can be reported by name
#[derive(Debug, Deserialize, Default)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

/// Accepts `"true"`, `true` or anything else as a string flag
pub(crate) fn deserialize_flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleString {
        Text(String),
        Flag(bool),
        Int(i64),
        Other(serde::de::IgnoredAny),
    }

    Ok(match FlexibleString::deserialize(deserializer)? {
        FlexibleString::Text(s) => s,
        FlexibleString::Flag(b) => b.to_string(),
        FlexibleString::Int(i) => i.to_string(),
        FlexibleString::Other(_) => String::new(),
    })
}

/// Top-level fields of the model's JSON answer. `questions` is read separately.
#[derive(Debug, Deserialize, Default)]
pub struct ModelOutputHeader {
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub success: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub error: String,
}

/// One question as the model writes it
#[derive(Debug, Deserialize, Clone)]
pub struct ModelQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: String,
}

impl From<ModelQuestion> for Question {
    fn from(q: ModelQuestion) -> Self {
        Question::new(q.question, q.options, q.correct_option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_labels_are_semantic() {
        assert_eq!("Multiple Choice".parse(), Ok(QuestionType::MultipleChoice));
        assert_eq!("multiple-choice".parse(), Ok(QuestionType::MultipleChoice));
        assert_eq!("Çoktan Seçmeli".parse(), Ok(QuestionType::MultipleChoice));
        assert_eq!("True/False".parse(), Ok(QuestionType::TrueFalse));
        assert_eq!("Doğru/Yanlış".parse(), Ok(QuestionType::TrueFalse));
        assert!("Essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn test_difficulty_labels() {
        assert_eq!("hard".parse(), Ok(Difficulty::Hard));
        assert_eq!("Kolay".parse(), Ok(Difficulty::Easy));
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn test_user_message_by_kind() {
        let policy = GenerationResult::failure(FailureKind::ContentPolicy, "bad topic");
        assert_eq!(policy.user_message().as_deref(), Some("bad topic"));

        let parse = GenerationResult::failure(FailureKind::Parse, "JSON parse error: eof");
        assert_eq!(
            parse.user_message().as_deref(),
            Some("An unexpected error occurred: JSON parse error: eof")
        );

        let silent = GenerationResult::Failure {
            kind: FailureKind::ContentPolicy,
            reason: None,
        };
        assert_eq!(
            silent.user_message().as_deref(),
            Some("An unknown error occurred.")
        );

        let ok = GenerationResult::Success { questions: vec![] };
        assert!(ok.user_message().is_none());
    }

    #[test]
    fn test_quiz_request_caps_topic_by_characters() {
        let long_topic = "ş".repeat(300);
        let req = QuizRequest::new(
            &long_topic,
            Difficulty::Easy,
            QuestionType::TrueFalse,
            "Türkçe",
            "10",
            250,
        )
        .unwrap();
        assert_eq!(req.topic.chars().count(), 250);
    }

    #[test]
    fn test_quiz_request_rejects_bad_input() {
        let make = |topic: &str, count: &str| {
            QuizRequest::new(
                topic,
                Difficulty::Medium,
                QuestionType::MultipleChoice,
                "English",
                count,
                250,
            )
        };
        assert!(make("   ", "5").is_err());
        assert!(make("Rust", "five").is_err());
        assert!(make("Rust", "0").is_err());
        assert!(make("Rust", "-3").is_err());
        assert_eq!(make("  Rust  ", " 5 ").unwrap().topic, "Rust");
    }

    #[test]
    fn test_request_envelope_shape() {
        let body = serde_json::to_value(GeminiRequest::from_prompt("hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents":[{"role":"user","parts":[{"text":"hello"}]}]})
        );
    }
}

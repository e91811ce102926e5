use crate::models::{Difficulty, QuestionType};

/// Builds the instruction sent to the model. Pure function of its inputs.
///
/// `topic` is embedded as given; callers cap its length beforehand.
pub fn build_prompt(
    topic: &str,
    difficulty: Difficulty,
    question_type: QuestionType,
    language: &str,
    count: &str,
) -> String {
    let option_count = question_type.options_per_question();
    let (options_rule, example_options) = match question_type {
        QuestionType::MultipleChoice => (
            format!("{option_count} options labeled A) to D)"),
            r#"        "A) Option 1",
        "B) Option 2",
        "C) Option 3",
        "D) Option 4""#,
        ),
        QuestionType::TrueFalse => (
            format!("{option_count} options: A) True, B) False (translated into {language})"),
            r#"        "A) True",
        "B) False""#,
        ),
    };

    format!(
        r#"You are a professional AI for generating quiz questions.

Task: Create exactly {count} {question_type} questions on the topic: "{topic}"
Difficulty: {difficulty}
Language: Use only {language} in questions, options, and answers.
Output Format: Return a single valid JSON object in the structure shown below.
Output Only: Return only JSON. Do not include any explanations, comments, or text outside the JSON.

Requirements:
- Each question must have:
    - A `question` field with the question text.
    - An `options` array with exactly {options_rule}.
    - A `correct_option` field that exactly matches one of the option strings.
- Do NOT include any explanation, metadata, or preamble.

JSON format:
{{
  "success": "true",
  "error": "",
  "questions": [
    {{
      "question": "Question text here",
      "options": [
{example_options}
      ],
      "correct_option": "A) ..."
    }}
  ]
}}

If the topic is inappropriate, irrelevant, or contains sensitive, obscene, or offensive content, do not generate questions. Respond with a JSON object like this instead, with no "questions" field:
{{
  "success": "false",
  "error": "Topic contains inappropriate content or is irrelevant."
}}

Ensure your output is:
- Fully parsable as JSON
- Free of trailing commas
- Encoded in UTF-8 plain text"#,
        question_type = question_type.label(),
        difficulty = difficulty.label(),
    )
}

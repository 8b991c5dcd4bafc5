// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Question type: 'single' (exactly one correct option) or 'multiple' (one or more).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Single,
    Multiple,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multiple => "multiple",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(QuestionType::Single),
            "multiple" => Some(QuestionType::Multiple),
            _ => None,
        }
    }
}

/// One answer option. The id is generated by the authoring client or the staging buffer
/// and is what `correct_answers` refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

impl QuestionOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    /// Stored as a JSON array of `{id, text}`.
    pub options: Vec<QuestionOption>,
    /// Option ids, stored as a JSON array.
    pub correct_answers: Vec<String>,
    pub order_index: i32,
}

/// Values for a question insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub quiz_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
    pub correct_answers: Vec<String>,
    pub order_index: i32,
}

/// A validated question held in the staging buffer, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedQuestion {
    /// Local id, stable across edits until the next synchronization.
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
    pub correct_option_ids: Vec<String>,
    /// Position assigned at commit time. May contain gaps after discards; persistence renumbers.
    pub order_index: i32,
}

impl StagedQuestion {
    pub fn to_new_question(&self, quiz_id: i64, order_index: i32) -> NewQuestion {
        NewQuestion {
            quiz_id,
            question_text: self.question_text.clone(),
            question_type: self.question_type,
            options: self.options.clone(),
            correct_answers: self.correct_option_ids.clone(),
            order_index,
        }
    }
}

/// Upper bound on the number of options of one question.
pub const MAX_OPTIONS: usize = 10;

/// DTO carrying the whole draft form.
/// Only size limits are checked here; the question invariants are enforced on commit.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DraftRequest {
    #[validate(length(max = 1000, message = "Question text must be at most 1000 characters."))]
    pub question_text: String,
    pub question_type: QuestionType,
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    #[validate(length(max = 10, message = "Too many correct answers."))]
    pub correct_option_ids: Vec<String>,
}

/// DTO for switching the draft between single and multiple choice.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionTypeRequest {
    pub question_type: QuestionType,
}

/// DTO for editing the text of one draft option.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptionTextRequest {
    #[validate(length(max = 500, message = "Option text must be at most 500 characters."))]
    pub text: String,
}

fn validate_options(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    if options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("too_many_options")
            .with_message(format!("A question can have at most {} options.", MAX_OPTIONS).into()));
    }
    if options.iter().any(|o| o.id.is_empty() || o.id.len() > 64) {
        return Err(validator::ValidationError::new("invalid_option_id")
            .with_message("Option ids must be 1 to 64 characters.".into()));
    }
    if options.iter().any(|o| o.text.chars().count() > 500) {
        return Err(validator::ValidationError::new("option_too_long")
            .with_message("Option text must be at most 500 characters.".into()));
    }
    Ok(())
}

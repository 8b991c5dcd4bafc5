// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Whether the time budget covers the whole quiz or resets for every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Overall,
    PerQuestion,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Overall => "overall",
            TimerMode::PerQuestion => "per_question",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overall" => Some(TimerMode::Overall),
            "per_question" => Some(TimerMode::PerQuestion),
            _ => None,
        }
    }
}

/// Timer configuration of a quiz.
/// Only the field belonging to the selected mode exists, so the other column is always stored as NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "timer_mode", rename_all = "snake_case")]
pub enum QuizTimer {
    Overall { total_time_minutes: i32 },
    PerQuestion { question_time_seconds: i32 },
}

impl QuizTimer {
    /// Builds the timer from the flat column/form representation.
    /// The value belonging to the other mode is ignored.
    pub fn from_parts(
        mode: TimerMode,
        total_time_minutes: Option<i32>,
        question_time_seconds: Option<i32>,
    ) -> Result<Self, AppError> {
        match mode {
            TimerMode::Overall => match total_time_minutes {
                Some(minutes) if minutes > 0 => Ok(QuizTimer::Overall {
                    total_time_minutes: minutes,
                }),
                _ => Err(AppError::validation("Please set total time in minutes")),
            },
            TimerMode::PerQuestion => match question_time_seconds {
                Some(seconds) if seconds > 0 => Ok(QuizTimer::PerQuestion {
                    question_time_seconds: seconds,
                }),
                _ => Err(AppError::validation("Please set per-question time in seconds")),
            },
        }
    }

    pub fn mode(&self) -> TimerMode {
        match self {
            QuizTimer::Overall { .. } => TimerMode::Overall,
            QuizTimer::PerQuestion { .. } => TimerMode::PerQuestion,
        }
    }

    pub fn total_time_minutes(&self) -> Option<i32> {
        match self {
            QuizTimer::Overall { total_time_minutes } => Some(*total_time_minutes),
            QuizTimer::PerQuestion { .. } => None,
        }
    }

    pub fn question_time_seconds(&self) -> Option<i32> {
        match self {
            QuizTimer::Overall { .. } => None,
            QuizTimer::PerQuestion {
                question_time_seconds,
            } => Some(*question_time_seconds),
        }
    }

    /// Human-readable budget, as shown on dashboards and share dialogs.
    pub fn describe(&self) -> String {
        match self {
            QuizTimer::Overall { total_time_minutes } => {
                format!("{} minutes total", total_time_minutes)
            }
            QuizTimer::PerQuestion {
                question_time_seconds,
            } => format!("{} seconds per question", question_time_seconds),
        }
    }
}

/// A persisted quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub access_key: String,
    #[serde(flatten)]
    pub timer: QuizTimer,
    /// False while the quiz is a draft, true once published.
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quiz listing entry with the number of persisted questions.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSummary {
    #[serde(flatten)]
    pub quiz: QuizRecord,
    pub question_count: i64,
}

/// Values for a quiz insert. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub access_key: String,
    pub timer: QuizTimer,
    pub created_by: i64,
}

/// Partial update of a quiz. `updated_at` is refreshed on every applied patch.
#[derive(Debug, Clone, Default)]
pub struct QuizPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub access_key: Option<String>,
    pub timer: Option<QuizTimer>,
    pub is_active: Option<bool>,
}

impl QuizPatch {
    pub fn activate() -> Self {
        Self {
            is_active: Some(true),
            ..Self::default()
        }
    }

    pub fn apply(self, quiz: &mut QuizRecord, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            quiz.title = title;
        }
        if let Some(description) = self.description {
            quiz.description = description;
        }
        if let Some(access_key) = self.access_key {
            quiz.access_key = access_key;
        }
        if let Some(timer) = self.timer {
            quiz.timer = timer;
        }
        if let Some(is_active) = self.is_active {
            quiz.is_active = is_active;
        }
        quiz.updated_at = now;
    }
}

/// DTO for creating or editing a quiz.
/// Mirrors the authoring form: both timer fields may be sent, only the one for `timer_mode` is kept.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuizForm {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters."),
        custom(function = validate_not_blank)
    )]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters."))]
    pub description: Option<String>,
    /// Omitted on create to have one generated, omitted on edit to keep the current one.
    pub access_key: Option<String>,
    pub timer_mode: TimerMode,
    pub total_time_minutes: Option<i32>,
    pub question_time_seconds: Option<i32>,
}

/// A `QuizForm` that passed every field invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidQuizForm {
    pub title: String,
    pub description: Option<String>,
    pub access_key: Option<String>,
    pub timer: QuizTimer,
}

impl QuizForm {
    pub fn into_valid(self) -> Result<ValidQuizForm, AppError> {
        self.validate()?;

        let timer = QuizTimer::from_parts(
            self.timer_mode,
            self.total_time_minutes,
            self.question_time_seconds,
        )?;

        let access_key = self
            .access_key
            .filter(|k| !k.trim().is_empty())
            .map(|k| crate::utils::access_key::normalize_access_key(&k))
            .transpose()?;

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(ValidQuizForm {
            title: self.title.trim().to_string(),
            description,
            access_key,
            timer,
        })
    }
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("Title is required".into()));
    }
    Ok(())
}

/// DTO for joining a quiz with its access code.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub access_key: String,
}

/// Everything an author needs to hand a quiz out.
#[derive(Debug, Serialize)]
pub struct ShareInfo {
    pub quiz_id: i64,
    pub title: String,
    pub access_key: String,
    pub join_url: String,
    pub timer_description: String,
    pub share_text: String,
}

// src/authoring/lifecycle.rs

use url::Url;

use super::Author;
use crate::{
    error::AppError,
    models::{
        question::QuestionRecord,
        quiz::{NewQuiz, QuizForm, QuizPatch, QuizRecord, QuizSummary, ShareInfo},
    },
    store::{QuestionStore, QuizStore},
    utils::access_key::{generate_access_key, normalize_access_key},
};

/// Generated keys are retried this many times before a collision is reported.
const MAX_KEY_ATTEMPTS: usize = 3;

/// Creation, editing and listing of quiz records.
///
/// Quizzes start as drafts (`is_active = false`) and only become visible to
/// consumers once published by the synchronizer. Metadata edits never touch the flag.
pub struct QuizLifecycle<'a> {
    quizzes: &'a dyn QuizStore,
    questions: &'a dyn QuestionStore,
}

impl<'a> QuizLifecycle<'a> {
    pub fn new(quizzes: &'a dyn QuizStore, questions: &'a dyn QuestionStore) -> Self {
        Self { quizzes, questions }
    }

    pub async fn create_quiz(&self, author: Author, form: QuizForm) -> Result<QuizRecord, AppError> {
        let form = form.into_valid()?;
        let supplied_key = form.access_key.is_some();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let access_key = form.access_key.clone().unwrap_or_else(generate_access_key);
            let new_quiz = NewQuiz {
                title: form.title.clone(),
                description: form.description.clone(),
                access_key,
                timer: form.timer,
                created_by: author.id,
            };

            match self.quizzes.insert_quiz(new_quiz).await {
                Ok(quiz) => {
                    tracing::info!("Author {} created quiz {}", author.id, quiz.id);
                    return Ok(quiz);
                }
                Err(AppError::Conflict(_)) if !supplied_key && attempt < MAX_KEY_ATTEMPTS => {
                    tracing::warn!("Generated access key collided, retrying (attempt {})", attempt);
                }
                Err(e) => return Err(e.with_action("Failed to create quiz")),
            }
        }
    }

    /// Owner-scoped load. Missing and foreign quizzes are indistinguishable.
    pub async fn load_for_edit(&self, author: Author, quiz_id: i64) -> Result<QuizRecord, AppError> {
        self.quizzes
            .find_owned(quiz_id, author.id)
            .await
            .map_err(|e| e.with_action("Failed to load quiz data"))?
            .ok_or(AppError::NotFoundOrForbidden)
    }

    /// Rewrites title, description, timer and (if given) access key.
    /// The inactive timer column is cleared; the active flag is left alone.
    pub async fn update_quiz(
        &self,
        author: Author,
        quiz_id: i64,
        form: QuizForm,
    ) -> Result<QuizRecord, AppError> {
        let form = form.into_valid()?;

        let patch = QuizPatch {
            title: Some(form.title),
            description: Some(form.description),
            access_key: form.access_key,
            timer: Some(form.timer),
            is_active: None,
        };

        let quiz = self
            .quizzes
            .update_quiz(quiz_id, author.id, patch)
            .await
            .map_err(|e| e.with_action("Failed to update quiz"))?
            .ok_or(AppError::NotFoundOrForbidden)?;

        tracing::info!("Author {} updated quiz {}", author.id, quiz.id);
        Ok(quiz)
    }

    /// Drafts and published quizzes of the author, newest first.
    pub async fn list_owned(&self, author: Author) -> Result<Vec<QuizSummary>, AppError> {
        self.quizzes
            .list_by_owner(author.id)
            .await
            .map_err(|e| e.with_action("Failed to load quizzes"))
    }

    /// Published quizzes only.
    pub async fn list_available(&self) -> Result<Vec<QuizSummary>, AppError> {
        self.quizzes
            .list_active()
            .await
            .map_err(|e| e.with_action("Failed to load quizzes"))
    }

    /// Join lookup. Drafts never match.
    pub async fn find_by_access_key(&self, access_key: &str) -> Result<QuizSummary, AppError> {
        let key = normalize_access_key(access_key)?;
        let quiz = self
            .quizzes
            .find_active_by_access_key(&key)
            .await
            .map_err(|e| e.with_action("Failed to join quiz"))?
            .ok_or(AppError::NotFoundOrForbidden)?;

        let question_count = self
            .questions
            .list_for_quiz(quiz.id)
            .await
            .map_err(|e| e.with_action("Failed to join quiz"))?
            .len() as i64;

        Ok(QuizSummary {
            quiz,
            question_count,
        })
    }

    /// The persisted question set of an owned quiz, in order.
    pub async fn persisted_questions(
        &self,
        author: Author,
        quiz_id: i64,
    ) -> Result<Vec<QuestionRecord>, AppError> {
        self.load_for_edit(author, quiz_id).await?;
        self.questions
            .list_for_quiz(quiz_id)
            .await
            .map_err(|e| e.with_action("Failed to load questions"))
    }

    pub async fn share_info(
        &self,
        author: Author,
        quiz_id: i64,
        base_url: &Url,
    ) -> Result<ShareInfo, AppError> {
        let quiz = self.load_for_edit(author, quiz_id).await?;
        Ok(build_share_info(&quiz, base_url))
    }
}

pub fn build_share_info(quiz: &QuizRecord, base_url: &Url) -> ShareInfo {
    let join_url = base_url
        .join(&format!("quiz/{}", quiz.id))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}/quiz/{}", base_url.as_str().trim_end_matches('/'), quiz.id));

    let share_text = format!(
        "Join my quiz \"{}\" using access code: {}\n\nQuiz Link: {}",
        quiz.title, quiz.access_key, join_url
    );

    ShareInfo {
        quiz_id: quiz.id,
        title: quiz.title.clone(),
        access_key: quiz.access_key.clone(),
        join_url,
        timer_description: quiz.timer.describe(),
        share_text,
    }
}

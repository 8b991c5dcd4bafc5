// src/authoring/sync.rs

use serde::Serialize;

use super::{Author, staging::renumber};
use crate::{
    error::AppError,
    models::{
        question::StagedQuestion,
        quiz::{QuizPatch, QuizRecord},
    },
    store::{QuestionStore, QuizStore},
};

/// Outcome of a replace-all write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub quiz_id: i64,
    /// Rows that existed before the write.
    pub removed: u64,
    /// Ids of the rows now stored, in order.
    pub question_ids: Vec<i64>,
}

/// Writes a staged sequence to the question store.
///
/// The whole persisted set is replaced on every call; there is no per-question diffing.
/// Delete and insert are separate calls, so a failed insert leaves the quiz without
/// questions until the author retries.
pub struct Synchronizer<'a> {
    quizzes: &'a dyn QuizStore,
    questions: &'a dyn QuestionStore,
}

impl<'a> Synchronizer<'a> {
    pub fn new(quizzes: &'a dyn QuizStore, questions: &'a dyn QuestionStore) -> Self {
        Self { quizzes, questions }
    }

    /// Replaces the persisted questions of `quiz_id` with `sequence`, numbered 1..N.
    /// The quiz record itself is not touched.
    pub async fn save_questions_only(
        &self,
        author: Author,
        quiz_id: i64,
        sequence: &[StagedQuestion],
    ) -> Result<SyncReport, AppError> {
        if sequence.is_empty() {
            return Err(AppError::EmptyQuestionSet);
        }
        self.owned_quiz(author, quiz_id).await?;

        let report = self
            .replace_all(quiz_id, sequence)
            .await
            .map_err(|e| e.with_action("Failed to save questions"))?;

        tracing::info!(
            "Saved {} questions for quiz {} (replaced {})",
            report.question_ids.len(),
            quiz_id,
            report.removed
        );
        Ok(report)
    }

    /// Persists `sequence` and activates the quiz.
    /// An empty sequence is rejected before any store call.
    pub async fn publish(
        &self,
        author: Author,
        quiz_id: i64,
        sequence: &[StagedQuestion],
    ) -> Result<QuizRecord, AppError> {
        if sequence.is_empty() {
            return Err(AppError::EmptyQuestionSet);
        }
        self.owned_quiz(author, quiz_id).await?;

        let report = self
            .replace_all(quiz_id, sequence)
            .await
            .map_err(|e| e.with_action("Failed to create quiz"))?;

        let quiz = self
            .quizzes
            .update_quiz(quiz_id, author.id, QuizPatch::activate())
            .await
            .map_err(|e| e.with_action("Failed to create quiz"))?
            .ok_or(AppError::NotFoundOrForbidden)?;

        tracing::info!(
            "Published quiz {} with {} questions",
            quiz_id,
            report.question_ids.len()
        );
        Ok(quiz)
    }

    async fn owned_quiz(&self, author: Author, quiz_id: i64) -> Result<QuizRecord, AppError> {
        self.quizzes
            .find_owned(quiz_id, author.id)
            .await?
            .ok_or(AppError::NotFoundOrForbidden)
    }

    async fn replace_all(
        &self,
        quiz_id: i64,
        sequence: &[StagedQuestion],
    ) -> Result<SyncReport, AppError> {
        let removed = self.questions.delete_for_quiz(quiz_id).await?;

        let question_ids = self
            .questions
            .insert_many(renumber(sequence, quiz_id))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "Insert failed after deleting {} questions of quiz {}: {}",
                    removed,
                    quiz_id,
                    e
                );
            })?;

        Ok(SyncReport {
            quiz_id,
            removed,
            question_ids,
        })
    }
}

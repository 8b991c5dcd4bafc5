// src/store/mod.rs

//! Persistence collaborators for quizzes and their question sets.
//!
//! The authoring core only talks to these traits. `PgStore` backs the server,
//! `MemoryStore` backs tests and local runs without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        question::{NewQuestion, QuestionRecord},
        quiz::{NewQuiz, QuizPatch, QuizRecord, QuizSummary},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Inserts an inactive quiz. A duplicate access key is reported as `Conflict`.
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<QuizRecord, AppError>;

    /// Loads a quiz only if `owner` created it.
    async fn find_owned(&self, id: i64, owner: i64) -> Result<Option<QuizRecord>, AppError>;

    /// Looks up a published quiz by its join code.
    async fn find_active_by_access_key(&self, access_key: &str)
    -> Result<Option<QuizRecord>, AppError>;

    /// Applies a partial update scoped to `owner` and refreshes `updated_at`.
    /// Returns `None` when no row matched.
    async fn update_quiz(
        &self,
        id: i64,
        owner: i64,
        patch: QuizPatch,
    ) -> Result<Option<QuizRecord>, AppError>;

    /// Every quiz of `owner`, newest first.
    async fn list_by_owner(&self, owner: i64) -> Result<Vec<QuizSummary>, AppError>;

    /// Published quizzes, newest first.
    async fn list_active(&self) -> Result<Vec<QuizSummary>, AppError>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Questions of a quiz ordered by `order_index`.
    async fn list_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuestionRecord>, AppError>;

    /// Removes every question of a quiz and returns how many rows went away.
    async fn delete_for_quiz(&self, quiz_id: i64) -> Result<u64, AppError>;

    /// Inserts all rows in one statement and returns the generated ids ordered by `order_index`.
    async fn insert_many(&self, questions: Vec<NewQuestion>) -> Result<Vec<i64>, AppError>;
}

// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use super::{QuestionStore, QuizStore};
use crate::{
    error::AppError,
    models::{
        question::{NewQuestion, QuestionOption, QuestionRecord, QuestionType},
        quiz::{NewQuiz, QuizPatch, QuizRecord, QuizSummary, QuizTimer, TimerMode},
    },
};

const QUIZ_COLUMNS: &str = "id, title, description, access_key, created_by, timer_mode, \
     total_time_minutes, question_time_seconds, is_active, created_at, updated_at";

const QUESTION_COUNT: &str =
    "(SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = quizzes.id) AS question_count";

/// Raw 'quizzes' row. Converted into `QuizRecord` once the timer columns are checked.
#[derive(Debug, FromRow)]
struct QuizRow {
    id: i64,
    title: String,
    description: Option<String>,
    access_key: String,
    created_by: i64,
    timer_mode: String,
    total_time_minutes: Option<i32>,
    question_time_seconds: Option<i32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuizRow> for QuizRecord {
    type Error = AppError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let mode = TimerMode::parse(&row.timer_mode).ok_or_else(|| {
            tracing::error!("Quiz {} has unknown timer_mode {:?}", row.id, row.timer_mode);
            AppError::Store("Failed to load quiz".to_string())
        })?;
        let timer = QuizTimer::from_parts(mode, row.total_time_minutes, row.question_time_seconds)
            .map_err(|e| {
                tracing::error!("Quiz {} has inconsistent timer columns: {}", row.id, e);
                AppError::Store("Failed to load quiz".to_string())
            })?;

        Ok(QuizRecord {
            id: row.id,
            title: row.title,
            description: row.description,
            access_key: row.access_key,
            timer,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct QuizSummaryRow {
    #[sqlx(flatten)]
    quiz: QuizRow,
    question_count: i64,
}

impl TryFrom<QuizSummaryRow> for QuizSummary {
    type Error = AppError;

    fn try_from(row: QuizSummaryRow) -> Result<Self, Self::Error> {
        Ok(QuizSummary {
            quiz: row.quiz.try_into()?,
            question_count: row.question_count,
        })
    }
}

/// Raw 'questions' row. `options` and `correct_answers` are JSONB arrays.
#[derive(Debug, FromRow)]
struct QuestionRow {
    id: i64,
    quiz_id: i64,
    question_text: String,
    question_type: String,
    options: Json<Vec<QuestionOption>>,
    correct_answers: Json<Vec<String>>,
    order_index: i32,
}

impl TryFrom<QuestionRow> for QuestionRecord {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = QuestionType::parse(&row.question_type).ok_or_else(|| {
            tracing::error!(
                "Question {} has unknown question_type {:?}",
                row.id,
                row.question_type
            );
            AppError::Store("Failed to load questions".to_string())
        })?;

        Ok(QuestionRecord {
            id: row.id,
            quiz_id: row.quiz_id,
            question_text: row.question_text,
            question_type,
            options: row.options.0,
            correct_answers: row.correct_answers.0,
            order_index: row.order_index,
        })
    }
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn summaries(
        &self,
        filter: &str,
        owner: Option<i64>,
    ) -> Result<Vec<QuizSummary>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        builder.push(QUIZ_COLUMNS);
        builder.push(", ");
        builder.push(QUESTION_COUNT);
        builder.push(" FROM quizzes WHERE ");
        builder.push(filter);
        if let Some(owner) = owner {
            builder.push_bind(owner);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<QuizSummaryRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(QuizSummary::try_from).collect()
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<QuizRecord, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            r#"
            INSERT INTO quizzes
            (title, description, access_key, created_by, timer_mode, total_time_minutes, question_time_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            QUIZ_COLUMNS
        ))
        .bind(quiz.title)
        .bind(quiz.description)
        .bind(quiz.access_key)
        .bind(quiz.created_by)
        .bind(quiz.timer.mode().as_str())
        .bind(quiz.timer.total_time_minutes())
        .bind(quiz.timer.question_time_seconds())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_owned(&self, id: i64, owner: i64) -> Result<Option<QuizRecord>, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1 AND created_by = $2",
            QUIZ_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuizRecord::try_from).transpose()
    }

    async fn find_active_by_access_key(
        &self,
        access_key: &str,
    ) -> Result<Option<QuizRecord>, AppError> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes WHERE access_key = $1 AND is_active = TRUE",
            QUIZ_COLUMNS
        ))
        .bind(access_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuizRecord::try_from).transpose()
    }

    async fn update_quiz(
        &self,
        id: i64,
        owner: i64,
        patch: QuizPatch,
    ) -> Result<Option<QuizRecord>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE quizzes SET updated_at = NOW()");

        if let Some(title) = patch.title {
            builder.push(", title = ");
            builder.push_bind(title);
        }

        if let Some(description) = patch.description {
            builder.push(", description = ");
            builder.push_bind(description);
        }

        if let Some(access_key) = patch.access_key {
            builder.push(", access_key = ");
            builder.push_bind(access_key);
        }

        if let Some(timer) = patch.timer {
            builder.push(", timer_mode = ");
            builder.push_bind(timer.mode().as_str());
            builder.push(", total_time_minutes = ");
            builder.push_bind(timer.total_time_minutes());
            builder.push(", question_time_seconds = ");
            builder.push_bind(timer.question_time_seconds());
        }

        if let Some(is_active) = patch.is_active {
            builder.push(", is_active = ");
            builder.push_bind(is_active);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND created_by = ");
        builder.push_bind(owner);
        builder.push(" RETURNING ");
        builder.push(QUIZ_COLUMNS);

        let row: Option<QuizRow> = builder.build_query_as().fetch_optional(&self.pool).await?;

        row.map(QuizRecord::try_from).transpose()
    }

    async fn list_by_owner(&self, owner: i64) -> Result<Vec<QuizSummary>, AppError> {
        self.summaries("created_by = ", Some(owner)).await
    }

    async fn list_active(&self) -> Result<Vec<QuizSummary>, AppError> {
        self.summaries("is_active = TRUE", None).await
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn list_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuestionRecord>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, quiz_id, question_text, question_type, options, correct_answers, order_index
            FROM questions
            WHERE quiz_id = $1
            ORDER BY order_index, id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuestionRecord::try_from).collect()
    }

    async fn delete_for_quiz(&self, quiz_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_many(&self, questions: Vec<NewQuestion>) -> Result<Vec<i64>, AppError> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        // Single multi-row INSERT: either every row lands or none does.
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO questions \
             (quiz_id, question_text, question_type, options, correct_answers, order_index) ",
        );
        builder.push_values(questions, |mut row, q| {
            row.push_bind(q.quiz_id)
                .push_bind(q.question_text)
                .push_bind(q.question_type.as_str())
                .push_bind(Json(q.options))
                .push_bind(Json(q.correct_answers))
                .push_bind(q.order_index);
        });
        builder.push(" RETURNING id, order_index");

        let rows: Vec<(i64, i32)> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(ids_by_order_index(rows))
    }
}

/// Postgres does not promise that `RETURNING` rows follow the VALUES order.
fn ids_by_order_index(mut rows: Vec<(i64, i32)>) -> Vec<i64> {
    rows.sort_by_key(|&(id, order_index)| (order_index, id));
    rows.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_ids_follow_order_index() {
        let rows = vec![(42, 3), (40, 1), (41, 2)];
        assert_eq!(ids_by_order_index(rows), vec![40, 41, 42]);
    }
}

// src/store/memory.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{QuestionStore, QuizStore};
use crate::{
    error::AppError,
    models::{
        question::{NewQuestion, QuestionRecord},
        quiz::{NewQuiz, QuizPatch, QuizRecord, QuizSummary},
    },
};

#[derive(Debug, Default)]
struct Tables {
    quizzes: Vec<QuizRecord>,
    questions: Vec<QuestionRecord>,
    next_quiz_id: i64,
    next_question_id: i64,
}

impl Tables {
    fn summarize(&self, quiz: &QuizRecord) -> QuizSummary {
        let question_count = self.questions.iter().filter(|q| q.quiz_id == quiz.id).count() as i64;
        QuizSummary {
            quiz: quiz.clone(),
            question_count,
        }
    }

    fn summaries<F>(&self, keep: F) -> Vec<QuizSummary>
    where
        F: Fn(&QuizRecord) -> bool,
    {
        let mut list: Vec<QuizSummary> = self
            .quizzes
            .iter()
            .filter(|q| keep(q))
            .map(|q| self.summarize(q))
            .collect();
        list.sort_by(|a, b| {
            b.quiz
                .created_at
                .cmp(&a.quiz.created_at)
                .then(b.quiz.id.cmp(&a.quiz.id))
        });
        list
    }

    fn access_key_taken(&self, access_key: &str, except: Option<i64>) -> bool {
        self.quizzes
            .iter()
            .any(|q| q.access_key == access_key && Some(q.id) != except)
    }
}

/// In-process store with the same contract as `PgStore`, including the access key uniqueness rule.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_key() -> AppError {
    AppError::Conflict("Access key is already in use".to_string())
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<QuizRecord, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.access_key_taken(&quiz.access_key, None) {
            return Err(duplicate_key());
        }

        tables.next_quiz_id += 1;
        let now = Utc::now();
        let record = QuizRecord {
            id: tables.next_quiz_id,
            title: quiz.title,
            description: quiz.description,
            access_key: quiz.access_key,
            timer: quiz.timer,
            is_active: false,
            created_by: quiz.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.quizzes.push(record.clone());
        Ok(record)
    }

    async fn find_owned(&self, id: i64, owner: i64) -> Result<Option<QuizRecord>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .quizzes
            .iter()
            .find(|q| q.id == id && q.created_by == owner)
            .cloned())
    }

    async fn find_active_by_access_key(
        &self,
        access_key: &str,
    ) -> Result<Option<QuizRecord>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .quizzes
            .iter()
            .find(|q| q.is_active && q.access_key == access_key)
            .cloned())
    }

    async fn update_quiz(
        &self,
        id: i64,
        owner: i64,
        patch: QuizPatch,
    ) -> Result<Option<QuizRecord>, AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(key) = &patch.access_key {
            if tables.access_key_taken(key, Some(id)) {
                return Err(duplicate_key());
            }
        }

        let Some(quiz) = tables
            .quizzes
            .iter_mut()
            .find(|q| q.id == id && q.created_by == owner)
        else {
            return Ok(None);
        };

        patch.apply(quiz, Utc::now());
        Ok(Some(quiz.clone()))
    }

    async fn list_by_owner(&self, owner: i64) -> Result<Vec<QuizSummary>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.summaries(|q| q.created_by == owner))
    }

    async fn list_active(&self) -> Result<Vec<QuizSummary>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.summaries(|q| q.is_active))
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn list_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuestionRecord>, AppError> {
        let tables = self.tables.lock().await;
        let mut list: Vec<QuestionRecord> = tables
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        list.sort_by_key(|q| (q.order_index, q.id));
        Ok(list)
    }

    async fn delete_for_quiz(&self, quiz_id: i64) -> Result<u64, AppError> {
        let mut tables = self.tables.lock().await;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.quiz_id != quiz_id);
        Ok((before - tables.questions.len()) as u64)
    }

    async fn insert_many(&self, questions: Vec<NewQuestion>) -> Result<Vec<i64>, AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(orphan) = questions
            .iter()
            .find(|q| !tables.quizzes.iter().any(|quiz| quiz.id == q.quiz_id))
        {
            return Err(AppError::Store(format!(
                "quiz {} does not exist",
                orphan.quiz_id
            )));
        }

        let mut ids = Vec::with_capacity(questions.len());
        for q in questions {
            tables.next_question_id += 1;
            let id = tables.next_question_id;
            ids.push((q.order_index, id));
            tables.questions.push(QuestionRecord {
                id,
                quiz_id: q.quiz_id,
                question_text: q.question_text,
                question_type: q.question_type,
                options: q.options,
                correct_answers: q.correct_answers,
                order_index: q.order_index,
            });
        }
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}

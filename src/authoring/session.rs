// src/authoring/session.rs

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{Mutex, MutexGuard, RwLock};

use super::{Author, StagingBuffer, SyncReport, Synchronizer};
use crate::{error::AppError, models::quiz::QuizRecord};

/// One author's staging buffer for one quiz.
#[derive(Debug, Default)]
pub struct AuthoringSession {
    buffer: Mutex<StagingBuffer>,
    saving: AtomicBool,
}

/// Clears the saving flag when the synchronization call ends, including when its future is dropped.
struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AuthoringSession {
    pub fn new(buffer: StagingBuffer) -> Self {
        Self {
            buffer: Mutex::new(buffer),
            saving: AtomicBool::new(false),
        }
    }

    pub async fn buffer(&self) -> MutexGuard<'_, StagingBuffer> {
        self.buffer.lock().await
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    fn begin_save(&self) -> Result<SavingGuard<'_>, AppError> {
        self.saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| SavingGuard(&self.saving))
            .map_err(|_| AppError::Conflict("A save is already in progress".to_string()))
    }

    /// Replace-all save of the current sequence. The buffer is kept for further edits.
    pub async fn save(
        &self,
        sync: &Synchronizer<'_>,
        author: Author,
        quiz_id: i64,
    ) -> Result<SyncReport, AppError> {
        let _guard = self.begin_save()?;
        let sequence = self.buffer.lock().await.questions().to_vec();
        sync.save_questions_only(author, quiz_id, &sequence).await
    }

    /// Publishes the current sequence and, on success, removes the published entries
    /// from the buffer. Work staged while the store calls were running is kept.
    /// On failure the buffer is left intact so the same call can be retried.
    pub async fn publish(
        &self,
        sync: &Synchronizer<'_>,
        author: Author,
        quiz_id: i64,
    ) -> Result<QuizRecord, AppError> {
        let _guard = self.begin_save()?;
        let sequence = self.buffer.lock().await.questions().to_vec();
        let quiz = sync.publish(author, quiz_id, &sequence).await?;
        self.buffer.lock().await.remove_published(&sequence);
        Ok(quiz)
    }
}

/// Process-local authoring sessions keyed by (author, quiz).
///
/// Sessions are not shared between authors. Two authors saving the same quiz
/// simply overwrite each other's question set.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<(i64, i64), Arc<AuthoringSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session, replacing any previous one for the same author and quiz.
    pub async fn open(
        &self,
        author: Author,
        quiz_id: i64,
        buffer: StagingBuffer,
    ) -> Arc<AuthoringSession> {
        let session = Arc::new(AuthoringSession::new(buffer));
        self.sessions
            .write()
            .await
            .insert((author.id, quiz_id), session.clone());
        tracing::debug!("Opened authoring session for quiz {} (author {})", quiz_id, author.id);
        session
    }

    pub async fn get(&self, author: Author, quiz_id: i64) -> Result<Arc<AuthoringSession>, AppError> {
        self.sessions
            .read()
            .await
            .get(&(author.id, quiz_id))
            .cloned()
            .ok_or(AppError::NotFoundOrForbidden)
    }

    /// Drops the session once it holds no unsaved work, e.g. after a publish.
    /// Returns whether it was removed.
    pub async fn close_if_idle(&self, author: Author, quiz_id: i64) -> bool {
        let mut sessions = self.sessions.write().await;
        let idle = match sessions.get(&(author.id, quiz_id)) {
            Some(session) => !session.is_saving() && session.buffer.lock().await.is_idle(),
            None => false,
        };
        if idle {
            sessions.remove(&(author.id, quiz_id));
        }
        idle
    }

    /// Drops the session and every unsaved change in it.
    pub async fn close(&self, author: Author, quiz_id: i64) -> bool {
        self.sessions
            .write()
            .await
            .remove(&(author.id, quiz_id))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            question::{QuestionOption, QuestionType},
            quiz::{NewQuiz, QuizTimer},
        },
        models::question::{NewQuestion, QuestionRecord},
        store::{MemoryStore, QuestionStore, QuizStore},
    };
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Question store whose inserts wait for the test to let them through.
    struct GatedQuestions {
        inner: MemoryStore,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl QuestionStore for GatedQuestions {
        async fn list_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuestionRecord>, AppError> {
            self.inner.list_for_quiz(quiz_id).await
        }

        async fn delete_for_quiz(&self, quiz_id: i64) -> Result<u64, AppError> {
            self.inner.delete_for_quiz(quiz_id).await
        }

        async fn insert_many(&self, questions: Vec<NewQuestion>) -> Result<Vec<i64>, AppError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.insert_many(questions).await
        }
    }

    const OWNER: Author = Author { id: 3 };

    fn staged_buffer() -> StagingBuffer {
        let mut buf = StagingBuffer::new();
        let a = QuestionOption::new("A");
        let correct = vec![a.id.clone()];
        buf.stage_draft_fields("Q", QuestionType::Single, vec![a, QuestionOption::new("B")], correct);
        buf.commit_draft().unwrap();
        buf
    }

    async fn quiz(store: &MemoryStore) -> i64 {
        store
            .insert_quiz(NewQuiz {
                title: "Quiz".into(),
                description: None,
                access_key: "AAAA-BBBB-CCCC".into(),
                timer: QuizTimer::Overall {
                    total_time_minutes: 5,
                },
                created_by: OWNER.id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn sessions_are_scoped_per_author() {
        let registry = SessionRegistry::new();
        registry.open(OWNER, 1, StagingBuffer::new()).await;

        assert!(registry.get(OWNER, 1).await.is_ok());
        assert_eq!(
            registry.get(Author::new(4), 1).await.unwrap_err(),
            AppError::NotFoundOrForbidden
        );
        assert!(registry.close(OWNER, 1).await);
        assert!(registry.get(OWNER, 1).await.is_err());
    }

    #[tokio::test]
    async fn overlapping_save_is_rejected() {
        let session = AuthoringSession::new(StagingBuffer::new());
        let guard = session.begin_save().unwrap();
        assert!(session.is_saving());
        assert!(matches!(session.begin_save(), Err(AppError::Conflict(_))));

        drop(guard);
        assert!(!session.is_saving());
        assert!(session.begin_save().is_ok());
    }

    #[tokio::test]
    async fn save_keeps_buffer_and_publish_clears_it() {
        let store = MemoryStore::new();
        let quiz_id = quiz(&store).await;
        let sync = Synchronizer::new(&store, &store);
        let session = AuthoringSession::new(staged_buffer());

        session.save(&sync, OWNER, quiz_id).await.unwrap();
        assert_eq!(session.buffer().await.len(), 1);
        assert!(!session.is_saving());

        let published = session.publish(&sync, OWNER, quiz_id).await.unwrap();
        assert!(published.is_active);
        assert!(session.buffer().await.is_empty());
        assert_eq!(store.list_for_quiz(quiz_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_publish_keeps_buffer() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(&store, &store);
        let session = AuthoringSession::new(staged_buffer());

        let err = session.publish(&sync, OWNER, 404).await.unwrap_err();
        assert_eq!(err, AppError::NotFoundOrForbidden);
        assert_eq!(session.buffer().await.len(), 1);
        assert!(!session.is_saving());
    }

    #[tokio::test]
    async fn question_committed_during_publish_stays_staged() {
        let store = MemoryStore::new();
        let quiz_id = quiz(&store).await;
        let gated = GatedQuestions {
            inner: store.clone(),
            entered: Notify::new(),
            release: Notify::new(),
        };
        let sync = Synchronizer::new(&store, &gated);
        let session = AuthoringSession::new(staged_buffer());

        let (published, _) = tokio::join!(session.publish(&sync, OWNER, quiz_id), async {
            gated.entered.notified().await;
            {
                let mut buf = session.buffer().await;
                let yes = QuestionOption::new("Yes");
                let correct = vec![yes.id.clone()];
                buf.stage_draft_fields(
                    "Late question",
                    QuestionType::Single,
                    vec![yes, QuestionOption::new("No")],
                    correct,
                );
                buf.commit_draft().unwrap();
            }
            gated.release.notify_one();
        });

        assert!(published.unwrap().is_active);
        let buf = session.buffer().await;
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.questions()[0].question_text, "Late question");

        let stored = store.list_for_quiz(quiz_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].question_text, "Q");
    }

    #[tokio::test]
    async fn idle_session_is_closed_after_publish() {
        let store = MemoryStore::new();
        let quiz_id = quiz(&store).await;
        let sync = Synchronizer::new(&store, &store);
        let registry = SessionRegistry::new();
        let session = registry.open(OWNER, quiz_id, staged_buffer()).await;

        assert!(!registry.close_if_idle(OWNER, quiz_id).await);

        session.publish(&sync, OWNER, quiz_id).await.unwrap();
        assert!(registry.close_if_idle(OWNER, quiz_id).await);
        assert!(registry.get(OWNER, quiz_id).await.is_err());
    }
}

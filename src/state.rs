use std::sync::Arc;

use crate::{
    authoring::{QuizLifecycle, SessionRegistry, Synchronizer},
    config::Config,
    store::{QuestionStore, QuizStore},
};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub quizzes: Arc<dyn QuizStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Builds the state around a store that serves both quizzes and questions.
    pub fn new<S>(config: Config, store: S) -> Self
    where
        S: QuizStore + QuestionStore + Clone + 'static,
    {
        Self {
            config,
            quizzes: Arc::new(store.clone()),
            questions: Arc::new(store),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn lifecycle(&self) -> QuizLifecycle<'_> {
        QuizLifecycle::new(self.quizzes.as_ref(), self.questions.as_ref())
    }

    pub fn synchronizer(&self) -> Synchronizer<'_> {
        Synchronizer::new(self.quizzes.as_ref(), self.questions.as_ref())
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

// tests/store_failure_tests.rs

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use quizquest::{
    authoring::SessionRegistry,
    config::Config,
    error::AppError,
    models::question::{NewQuestion, QuestionRecord},
    routes,
    state::AppState,
    store::{MemoryStore, QuestionStore},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use url::Url;

const TEST_SECRET: &str = "test_secret_for_integration_tests";

/// Question store whose inserts fail while `fail_insert` is set.
/// Deletes still go through, which is the worst case for a replace-all write.
#[derive(Clone)]
struct UnreliableQuestions {
    inner: MemoryStore,
    fail_insert: Arc<AtomicBool>,
}

#[async_trait]
impl QuestionStore for UnreliableQuestions {
    async fn list_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuestionRecord>, AppError> {
        self.inner.list_for_quiz(quiz_id).await
    }

    async fn delete_for_quiz(&self, quiz_id: i64) -> Result<u64, AppError> {
        self.inner.delete_for_quiz(quiz_id).await
    }

    async fn insert_many(&self, questions: Vec<NewQuestion>) -> Result<Vec<i64>, AppError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(AppError::Store("connection reset".into()));
        }
        self.inner.insert_many(questions).await
    }
}

async fn spawn_app(fail_insert: Arc<AtomicBool>) -> String {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        rust_log: "error".to_string(),
        app_port: 0,
        public_base_url: Url::parse("https://quiz.example.com").unwrap(),
        join_replenish_seconds: 1,
        join_burst_size: 100,
    };

    let store = MemoryStore::new();
    let state = AppState {
        config,
        quizzes: Arc::new(store.clone()),
        questions: Arc::new(UnreliableQuestions {
            inner: store,
            fail_insert,
        }),
        sessions: Arc::new(SessionRegistry::new()),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn failed_save_is_retryable_and_keeps_staging() {
    let fail_insert = Arc::new(AtomicBool::new(false));
    let address = spawn_app(fail_insert.clone()).await;
    let client = reqwest::Client::new();
    let token = sign_jwt(1, "teacher", TEST_SECRET, 600).unwrap();

    let quiz: Value = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Fractions",
            "timer_mode": "per_question",
            "question_time_seconds": 45
        }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    client
        .post(format!("{}/api/quizzes/{}/staging", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    client
        .put(format!("{}/api/quizzes/{}/staging/draft", address, quiz_id))
        .bearer_auth(&token)
        .json(&json!({
            "question_text": "Capital of France?",
            "question_type": "single",
            "options": [
                { "id": "a", "text": "Paris" },
                { "id": "b", "text": "Lyon" }
            ],
            "correct_option_ids": ["a"]
        }))
        .send()
        .await
        .expect("Failed to execute request");
    client
        .post(format!("{}/api/quizzes/{}/staging/draft/commit", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");

    fail_insert.store(true, Ordering::SeqCst);
    let response = client
        .post(format!("{}/api/quizzes/{}/staging/publish", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to create quiz");
    assert_eq!(body["retryable"], true);

    // Staged questions survive and the quiz is still a draft
    let view: Value = client
        .get(format!("{}/api/quizzes/{}/staging", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(view["questions"].as_array().unwrap().len(), 1);
    assert_eq!(view["saving"], false);

    let quiz: Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(quiz["is_active"], false);

    // Retrying with the same staged set succeeds
    fail_insert.store(false, Ordering::SeqCst);
    let response = client
        .post(format!("{}/api/quizzes/{}/staging/publish", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let questions: Value = client
        .get(format!("{}/api/quizzes/{}/questions", address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(questions.as_array().unwrap().len(), 1);
    assert_eq!(questions[0]["order_index"], 1);
}

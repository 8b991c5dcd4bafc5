// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{quiz, staging},
    state::AppState,
    utils::jwt::{auth_middleware, author_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: available quizzes, join by access code (rate limited), key generation.
/// * Author routes: quiz metadata and the staging/synchronization endpoints.
/// * Applies global middleware (Trace, CORS).
///
/// The rate limiter keys on the peer address, so the app must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = [
        state.config.public_base_url.origin().ascii_serialization(),
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let mut join_routes = Router::new().route("/join", post(quiz::join_quiz));
    match GovernorConfigBuilder::default()
        .per_second(state.config.join_replenish_seconds)
        .burst_size(state.config.join_burst_size)
        .finish()
    {
        Some(governor_conf) => {
            join_routes = join_routes.layer(GovernorLayer::new(Arc::new(governor_conf)));
        }
        None => tracing::warn!("Invalid join rate limit settings, join endpoint is not rate limited"),
    }

    let public_routes = Router::new()
        .route("/available", get(quiz::list_available_quizzes))
        .merge(join_routes);

    let author_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route("/mine", get(quiz::list_my_quizzes))
        .route("/{id}", get(quiz::get_quiz).put(quiz::update_quiz))
        .route("/{id}/share", get(quiz::share_quiz))
        .route("/{id}/questions", get(quiz::list_questions))
        .route(
            "/{id}/staging",
            post(staging::open_staging)
                .get(staging::get_staging)
                .delete(staging::close_staging),
        )
        .route("/{id}/staging/draft", put(staging::stage_draft))
        .route("/{id}/staging/draft/type", put(staging::set_question_type))
        .route("/{id}/staging/draft/options", post(staging::add_option))
        .route(
            "/{id}/staging/draft/options/{option_id}",
            put(staging::set_option_text).delete(staging::remove_option),
        )
        .route(
            "/{id}/staging/draft/options/{option_id}/correct",
            post(staging::toggle_correct),
        )
        .route("/{id}/staging/draft/commit", post(staging::commit_draft))
        .route("/{id}/staging/draft/cancel", post(staging::cancel_edit))
        .route(
            "/{id}/staging/questions/{question_id}/edit",
            post(staging::edit_question),
        )
        .route(
            "/{id}/staging/questions/{question_id}",
            delete(staging::discard_question),
        )
        .route("/{id}/staging/save", post(staging::save_questions))
        .route("/{id}/staging/publish", post(staging::publish_quiz))
        // Auth first, then the role check
        .layer(middleware::from_fn(author_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let access_key_routes = Router::new().route("/new", get(quiz::new_access_key));

    Router::new()
        .nest("/api/quizzes", public_routes.merge(author_routes))
        .nest("/api/access-keys", access_key_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, store::MemoryStore, utils::jwt::sign_jwt};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config {
            database_url: "postgres://unused".into(),
            jwt_secret: "router_test_secret".into(),
            rust_log: "error".into(),
            app_port: 0,
            public_base_url: url::Url::parse("http://localhost:3000").unwrap(),
            join_replenish_seconds: 1,
            join_burst_size: 10,
        };
        create_router(AppState::new(config, MemoryStore::new()))
    }

    #[tokio::test]
    async fn author_routes_reject_missing_and_bad_tokens() {
        let response = app()
            .oneshot(Request::get("/api/quizzes/mine").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app()
            .oneshot(
                Request::get("/api/quizzes/mine")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn teacher_token_reaches_handlers() {
        let token = sign_jwt(3, "teacher", "router_test_secret", 60).unwrap();
        let response = app()
            .oneshot(
                Request::get("/api/quizzes/mine")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn available_quizzes_are_public() {
        let response = app()
            .oneshot(
                Request::get("/api/quizzes/available")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

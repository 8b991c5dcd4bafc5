// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    authoring::Author,
    error::AppError,
    models::quiz::{JoinRequest, QuizForm},
    state::AppState,
    utils::{access_key::generate_access_key, json::AppJson},
};

/// Returns a fresh access key. Nothing is stored until a quiz is saved with it.
pub async fn new_access_key() -> impl IntoResponse {
    Json(json!({ "access_key": generate_access_key() }))
}

/// Creates a draft quiz owned by the caller.
pub async fn create_quiz(
    State(state): State<AppState>,
    author: Author,
    AppJson(form): AppJson<QuizForm>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.lifecycle().create_quiz(author, form).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Lists the caller's quizzes, drafts included.
pub async fn list_my_quizzes(
    State(state): State<AppState>,
    author: Author,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.lifecycle().list_owned(author).await?;
    Ok(Json(quizzes))
}

/// Lists published quizzes.
pub async fn list_available_quizzes(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.lifecycle().list_available().await?;
    Ok(Json(quizzes))
}

/// Looks up a published quiz by access code.
pub async fn join_quiz(
    State(state): State<AppState>,
    AppJson(req): AppJson<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.lifecycle().find_by_access_key(&req.access_key).await?;
    Ok(Json(quiz))
}

/// Loads a quiz for editing. Only the owner can see it.
pub async fn get_quiz(
    State(state): State<AppState>,
    author: Author,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.lifecycle().load_for_edit(author, id).await?;
    Ok(Json(quiz))
}

/// Updates quiz metadata. The published flag is not affected.
pub async fn update_quiz(
    State(state): State<AppState>,
    author: Author,
    Path(id): Path<i64>,
    AppJson(form): AppJson<QuizForm>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.lifecycle().update_quiz(author, id, form).await?;
    Ok(Json(quiz))
}

/// Join link, access code and share text for a quiz.
pub async fn share_quiz(
    State(state): State<AppState>,
    author: Author,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let info = state
        .lifecycle()
        .share_info(author, id, &state.config.public_base_url)
        .await?;
    Ok(Json(info))
}

/// The persisted question set of a quiz, in order.
pub async fn list_questions(
    State(state): State<AppState>,
    author: Author,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = state.lifecycle().persisted_questions(author, id).await?;
    Ok(Json(questions))
}

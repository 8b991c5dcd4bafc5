// src/handlers/staging.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    authoring::{Author, AuthoringSession, DraftQuestion, StagingBuffer},
    error::AppError,
    models::question::{
        DraftRequest, MAX_OPTIONS, OptionTextRequest, QuestionTypeRequest, StagedQuestion,
    },
    state::AppState,
    utils::json::AppJson,
};

#[derive(Debug, Deserialize)]
pub struct OpenStagingQuery {
    /// Start from the persisted question set instead of an empty list.
    #[serde(default)]
    pub load: bool,
}

/// Snapshot of an authoring session returned by every staging endpoint.
#[derive(Debug, Serialize)]
pub struct StagingView {
    pub quiz_id: i64,
    pub questions: Vec<StagedQuestion>,
    pub draft: DraftQuestion,
    pub saving: bool,
}

async fn view(quiz_id: i64, session: &AuthoringSession) -> StagingView {
    let buffer = session.buffer().await;
    StagingView {
        quiz_id,
        questions: buffer.questions().to_vec(),
        draft: buffer.draft().clone(),
        saving: session.is_saving(),
    }
}

/// Opens (or reopens) the caller's staging buffer for a quiz they own.
pub async fn open_staging(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
    Query(query): Query<OpenStagingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let lifecycle = state.lifecycle();
    lifecycle.load_for_edit(author, quiz_id).await?;

    let buffer = if query.load {
        StagingBuffer::from_persisted(lifecycle.persisted_questions(author, quiz_id).await?)
    } else {
        StagingBuffer::new()
    };

    let session = state.sessions.open(author, quiz_id, buffer).await;
    Ok((StatusCode::CREATED, Json(view(quiz_id, &session).await)))
}

pub async fn get_staging(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    Ok(Json(view(quiz_id, &session).await))
}

/// Abandons the session. Unsaved questions are lost.
pub async fn close_staging(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.sessions.close(author, quiz_id).await {
        return Err(AppError::NotFoundOrForbidden);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the draft form fields.
pub async fn stage_draft(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
    AppJson(req): AppJson<DraftRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let session = state.sessions.get(author, quiz_id).await?;
    session.buffer().await.stage_draft_fields(
        req.question_text,
        req.question_type,
        req.options,
        req.correct_option_ids,
    );
    Ok(Json(view(quiz_id, &session).await))
}

fn unknown_option() -> AppError {
    AppError::validation("Option is not in the draft")
}

pub async fn set_question_type(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
    AppJson(req): AppJson<QuestionTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    session.buffer().await.draft_mut().set_question_type(req.question_type);
    Ok(Json(view(quiz_id, &session).await))
}

/// Appends an empty option to the draft.
pub async fn add_option(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    {
        let mut buffer = session.buffer().await;
        if buffer.draft().options.len() >= MAX_OPTIONS {
            return Err(AppError::validation(format!(
                "A question can have at most {} options.",
                MAX_OPTIONS
            )));
        }
        buffer.draft_mut().add_option();
    }
    Ok((StatusCode::CREATED, Json(view(quiz_id, &session).await)))
}

pub async fn set_option_text(
    State(state): State<AppState>,
    author: Author,
    Path((quiz_id, option_id)): Path<(i64, String)>,
    AppJson(req): AppJson<OptionTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let session = state.sessions.get(author, quiz_id).await?;
    if !session.buffer().await.draft_mut().set_option_text(&option_id, req.text) {
        return Err(unknown_option());
    }
    Ok(Json(view(quiz_id, &session).await))
}

/// Removes a draft option, unselecting it if it was marked correct.
pub async fn remove_option(
    State(state): State<AppState>,
    author: Author,
    Path((quiz_id, option_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    {
        let mut buffer = session.buffer().await;
        if !buffer.draft().has_option(&option_id) {
            return Err(unknown_option());
        }
        buffer.draft_mut().remove_option(&option_id);
    }
    Ok(Json(view(quiz_id, &session).await))
}

/// Marks or unmarks a draft option as correct.
pub async fn toggle_correct(
    State(state): State<AppState>,
    author: Author,
    Path((quiz_id, option_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    {
        let mut buffer = session.buffer().await;
        if !buffer.draft().has_option(&option_id) {
            return Err(unknown_option());
        }
        buffer.draft_mut().toggle_correct(&option_id);
    }
    Ok(Json(view(quiz_id, &session).await))
}

/// Validates the draft and adds it to (or replaces it in) the staged list.
pub async fn commit_draft(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    session.buffer().await.commit_draft()?;
    Ok(Json(view(quiz_id, &session).await))
}

pub async fn cancel_edit(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    session.buffer().await.cancel_edit();
    Ok(Json(view(quiz_id, &session).await))
}

/// Copies a staged question into the draft for editing.
pub async fn edit_question(
    State(state): State<AppState>,
    author: Author,
    Path((quiz_id, question_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    session.buffer().await.load_for_edit(&question_id)?;
    Ok(Json(view(quiz_id, &session).await))
}

pub async fn discard_question(
    State(state): State<AppState>,
    author: Author,
    Path((quiz_id, question_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    session.buffer().await.discard(&question_id)?;
    Ok(Json(view(quiz_id, &session).await))
}

/// Replace-all save of the staged questions. The quiz stays in its current state.
pub async fn save_questions(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    let report = session
        .save(&state.synchronizer(), author, quiz_id)
        .await?;
    Ok(Json(report))
}

/// Saves the staged questions and publishes the quiz.
/// The session is closed afterwards unless something was staged while it ran.
pub async fn publish_quiz(
    State(state): State<AppState>,
    author: Author,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.get(author, quiz_id).await?;
    let quiz = session
        .publish(&state.synchronizer(), author, quiz_id)
        .await?;
    drop(session);
    state.sessions.close_if_idle(author, quiz_id).await;
    Ok(Json(quiz))
}

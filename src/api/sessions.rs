use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::AppState;
use crate::auth::UserSession;
use crate::error::{AppError, AppResult};
use crate::models::{
    EditExerciseSessionRequest, EditSupersetRequest, ExerciseSessionDetail, IntervalData, ItemKind, RestData,
    SessionItem, SessionItemDetail, SetData, SupersetDetail,
};

/// Exercise sessions, their items and supersets
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/exercise-sessions/:id", get(get_exercise_session).put(edit_exercise_session))
        .route("/exercise-sessions/:id/sets", post(add_set))
        .route("/sets/:id", put(update_set).delete(delete_set))
        .route("/rests/:id", put(update_rest).delete(delete_rest))
        .route("/intervals/:id", put(update_interval).delete(delete_interval))
        .route("/supersets/:id", put(edit_superset))
}

#[tracing::instrument(skip(state, session))]
async fn get_exercise_session(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ExerciseSessionDetail>> {
    Ok(Json(state.sessions.get(session.user_id, session_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn edit_exercise_session(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<EditExerciseSessionRequest>, AppError>,
) -> AppResult<Json<ExerciseSessionDetail>> {
    Ok(Json(state.sessions.edit(session.user_id, session_id, request).await?))
}

#[tracing::instrument(skip(state, session, set))]
async fn add_set(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(set), _): WithRejection<Json<SetData>, AppError>,
) -> AppResult<(StatusCode, Json<SessionItemDetail>)> {
    let item = state.sessions.add_set(session.user_id, session_id, set).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[tracing::instrument(skip(state, session, set))]
async fn update_set(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(set), _): WithRejection<Json<SetData>, AppError>,
) -> AppResult<Json<SessionItemDetail>> {
    let item = state
        .sessions
        .update_item(session.user_id, item_id, SessionItem::Set(set))
        .await?;
    Ok(Json(item))
}

#[tracing::instrument(skip(state, session, rest))]
async fn update_rest(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(rest), _): WithRejection<Json<RestData>, AppError>,
) -> AppResult<Json<SessionItemDetail>> {
    let item = state
        .sessions
        .update_item(session.user_id, item_id, SessionItem::Rest(rest))
        .await?;
    Ok(Json(item))
}

#[tracing::instrument(skip(state, session, interval))]
async fn update_interval(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(interval), _): WithRejection<Json<IntervalData>, AppError>,
) -> AppResult<Json<SessionItemDetail>> {
    let item = state
        .sessions
        .update_item(session.user_id, item_id, SessionItem::Interval(interval))
        .await?;
    Ok(Json(item))
}

async fn delete_set(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.sessions.delete_item(session.user_id, ItemKind::Set, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_rest(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.sessions.delete_item(session.user_id, ItemKind::Rest, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_interval(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state
        .sessions
        .delete_item(session.user_id, ItemKind::Interval, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session, request))]
async fn edit_superset(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(superset_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<EditSupersetRequest>, AppError>,
) -> AppResult<Json<SupersetDetail>> {
    Ok(Json(state.sessions.edit_superset(session.user_id, superset_id, request).await?))
}

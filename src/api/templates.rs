use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::AppState;
use crate::auth::UserSession;
use crate::error::{AppError, AppResult};
use crate::models::{CreateWorkoutRequest, EditWorkoutRequest, StartedWorkout, TemplateDetails, WorkoutTemplate};

pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:id", get(get_template).put(edit_template).delete(delete_template))
        .route("/:id/publish", post(publish_template))
        .route("/:id/start", post(start_template))
}

/// Own templates plus everything published
#[tracing::instrument(skip(state, session))]
async fn list_templates(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<Vec<WorkoutTemplate>>> {
    Ok(Json(state.templates.list(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn create_template(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateWorkoutRequest>, AppError>,
) -> AppResult<(StatusCode, Json<TemplateDetails>)> {
    let template = state.templates.create(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[tracing::instrument(skip(state, session))]
async fn get_template(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(template_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<TemplateDetails>> {
    Ok(Json(state.templates.get(session.user_id, template_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn edit_template(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(template_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<EditWorkoutRequest>, AppError>,
) -> AppResult<Json<TemplateDetails>> {
    Ok(Json(state.templates.edit(session.user_id, template_id, request).await?))
}

#[tracing::instrument(skip(state, session))]
async fn delete_template(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(template_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.templates.delete(session.user_id, template_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session))]
async fn publish_template(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(template_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<WorkoutTemplate>> {
    Ok(Json(state.templates.publish(session.user_id, template_id).await?))
}

/// Copies the template into a fresh workout owned by the caller
#[tracing::instrument(skip(state, session))]
async fn start_template(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(template_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<(StatusCode, Json<StartedWorkout>)> {
    let started = state.templates.start(session.user_id, template_id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::AppState;
use crate::auth::UserSession;
use crate::error::{AppError, AppResult};
use crate::models::{CreateWorkoutRequest, EditWorkoutRequest, WorkoutDetails, WorkoutSession};

pub fn workout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workouts).post(create_workout))
        .route("/:id", get(get_workout).put(edit_workout).delete(delete_workout))
}

/// Logged workouts, newest first
#[tracing::instrument(skip(state, session))]
async fn list_workouts(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<Vec<WorkoutSession>>> {
    Ok(Json(state.workouts.list(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn create_workout(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateWorkoutRequest>, AppError>,
) -> AppResult<(StatusCode, Json<WorkoutDetails>)> {
    let workout = state.workouts.create(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

#[tracing::instrument(skip(state, session))]
async fn get_workout(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(workout_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<WorkoutDetails>> {
    Ok(Json(state.workouts.get(session.user_id, workout_id).await?))
}

/// Reconciles the submitted tree against the stored one
#[tracing::instrument(skip(state, session, request))]
async fn edit_workout(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(workout_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<EditWorkoutRequest>, AppError>,
) -> AppResult<Json<WorkoutDetails>> {
    Ok(Json(state.workouts.edit(session.user_id, workout_id, request).await?))
}

#[tracing::instrument(skip(state, session))]
async fn delete_workout(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(workout_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.workouts.delete(session.user_id, workout_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

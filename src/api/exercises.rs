use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::{Multipart, WithRejection};
use uuid::Uuid;

use super::{read_file_field, AppState, MAX_UPLOAD_BYTES};
use crate::auth::{MessageResponse, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateExerciseRequest, ExerciseProgressResponse, ExerciseResponse, ExerciseSearchQuery, ExerciseSearchResponse,
    MuscleGroup,
};

pub fn exercise_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exercise))
        .route("/muscle-groups", get(muscle_groups))
        .route("/search", get(search_exercises))
        .route("/:id", get(get_exercise).delete(delete_exercise))
        .route("/:id/publish", post(publish_exercise))
        .route(
            "/:id/video",
            post(upload_video).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/:id/progress", get(exercise_progress))
}

async fn muscle_groups(State(state): State<AppState>) -> AppResult<Json<Vec<MuscleGroup>>> {
    Ok(Json(state.exercises.muscle_groups().await?))
}

/// Own exercises and published ones whose name contains the query
#[tracing::instrument(skip(state, session))]
async fn search_exercises(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): WithRejection<Query<ExerciseSearchQuery>, AppError>,
) -> AppResult<Json<ExerciseSearchResponse>> {
    Ok(Json(state.exercises.search(session.user_id, &query.name).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn create_exercise(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateExerciseRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ExerciseResponse>)> {
    let exercise = state.exercises.create(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

#[tracing::instrument(skip(state, session))]
async fn get_exercise(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(exercise_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ExerciseResponse>> {
    Ok(Json(state.exercises.get(session.user_id, exercise_id).await?))
}

#[tracing::instrument(skip(state, session))]
async fn publish_exercise(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(exercise_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ExerciseResponse>> {
    Ok(Json(state.exercises.publish(session.user_id, exercise_id).await?))
}

#[tracing::instrument(skip(state, session))]
async fn delete_exercise(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(exercise_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.exercises.delete(session.user_id, exercise_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session, multipart))]
async fn upload_video(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(exercise_id), _): WithRejection<Path<Uuid>, AppError>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let (data, content_type) = read_file_field(multipart, "video").await?;
    state
        .exercises
        .upload_video(session.user_id, exercise_id, data, &content_type)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(MessageResponse::new("Exercise video upload started"))))
}

#[tracing::instrument(skip(state, session))]
async fn exercise_progress(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(exercise_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ExerciseProgressResponse>> {
    Ok(Json(state.exercises.progress(session.user_id, exercise_id).await?))
}

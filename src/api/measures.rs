use axum::{extract::State, response::Json, routing::{get, put}, Extension, Router};
use axum_extra::extract::WithRejection;

use super::AppState;
use crate::auth::UserSession;
use crate::error::{AppError, AppResult};
use crate::models::{ActivityRequest, FitnessResponse, GoalRequest, MeasuresResponse, UpdateMeasuresRequest, WeightSummary};

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/measures", get(get_measures).put(update_measures))
        .route("/weight", get(weight_summary))
        .route("/fitness", get(get_fitness))
        .route("/fitness/activity", put(set_activity))
        .route("/fitness/goal", put(set_goal))
}

async fn get_measures(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<MeasuresResponse>> {
    Ok(Json(state.health.get_measures(session.user_id).await?))
}

/// Updates height and weight, recording a history row when either moved
#[tracing::instrument(skip(state, session, request))]
async fn update_measures(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateMeasuresRequest>, AppError>,
) -> AppResult<Json<MeasuresResponse>> {
    Ok(Json(state.health.update_measures(session.user_id, request).await?))
}

#[tracing::instrument(skip(state, session))]
async fn weight_summary(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<WeightSummary>> {
    Ok(Json(state.health.weight_summary(session.user_id).await?))
}

async fn get_fitness(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<FitnessResponse>> {
    Ok(Json(state.health.get_fitness(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_activity(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<ActivityRequest>, AppError>,
) -> AppResult<Json<FitnessResponse>> {
    Ok(Json(state.health.set_activity(session.user_id, &request.activity).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_goal(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<GoalRequest>, AppError>,
) -> AppResult<Json<FitnessResponse>> {
    Ok(Json(state.health.set_goal(session.user_id, &request.goal).await?))
}

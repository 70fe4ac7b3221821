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
use crate::models::{CreatePlanRequest, CreateRoutineRequest, PlanDetails, PlanSummary, Routine, RoutineDetails};

/// Workout plans and weekly routines
pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/active", get(active_plan))
        .route("/plans/:id", get(get_plan).delete(delete_plan))
        .route("/plans/:id/activate", post(activate_plan))
        .route("/routines", get(list_routines).post(create_routine))
        .route("/routines/:id", get(get_routine).delete(delete_routine))
}

#[tracing::instrument(skip(state, session))]
async fn list_plans(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<Vec<PlanSummary>>> {
    Ok(Json(state.plans.list_plans(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn create_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreatePlanRequest>, AppError>,
) -> AppResult<(StatusCode, Json<PlanDetails>)> {
    let plan = state.plans.create_plan(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

#[tracing::instrument(skip(state, session))]
async fn get_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<PlanDetails>> {
    Ok(Json(state.plans.get_plan(session.user_id, plan_id).await?))
}

/// Removes the plan; its workouts stay in the log
#[tracing::instrument(skip(state, session))]
async fn delete_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.plans.delete_plan(session.user_id, plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, session))]
async fn activate_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(plan_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<PlanDetails>> {
    Ok(Json(state.plans.activate_plan(session.user_id, plan_id).await?))
}

#[tracing::instrument(skip(state, session))]
async fn active_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<PlanDetails>> {
    Ok(Json(state.plans.active_plan(session.user_id).await?))
}

#[tracing::instrument(skip(state, session))]
async fn list_routines(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<Vec<Routine>>> {
    Ok(Json(state.plans.list_routines(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn create_routine(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<CreateRoutineRequest>, AppError>,
) -> AppResult<(StatusCode, Json<RoutineDetails>)> {
    let routine = state.plans.create_routine(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(routine)))
}

#[tracing::instrument(skip(state, session))]
async fn get_routine(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(routine_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<RoutineDetails>> {
    Ok(Json(state.plans.get_routine(session.user_id, routine_id).await?))
}

#[tracing::instrument(skip(state, session))]
async fn delete_routine(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(routine_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    state.plans.delete_routine(session.user_id, routine_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

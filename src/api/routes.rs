use axum::{middleware, routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use super::health::health_check;
use super::{auth, exercises, measures, plans, profile, sessions, templates, workouts};
use crate::auth::{cors_layer, jwt_auth_middleware, security_headers_layer, AuthService};
use crate::config::AppConfig;
use crate::services::{
    ExerciseService, ExerciseSessionService, HealthService, PlanService, ProfileService, TaskQueue,
    TemplateService, WorkoutService,
};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub health: HealthService,
    pub exercises: ExerciseService,
    pub sessions: ExerciseSessionService,
    pub workouts: WorkoutService,
    pub templates: TemplateService,
    pub plans: PlanService,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig, tasks: TaskQueue) -> Self {
        let media_enabled = config.media_enabled();

        Self {
            auth: AuthService::new(db.clone(), &config.jwt_secret, tasks.clone()),
            profiles: ProfileService::new(db.clone(), tasks.clone(), media_enabled),
            health: HealthService::new(db.clone()),
            exercises: ExerciseService::new(db.clone(), tasks, media_enabled),
            sessions: ExerciseSessionService::new(db.clone()),
            workouts: WorkoutService::new(db.clone()),
            templates: TemplateService::new(db.clone()),
            plans: PlanService::new(db),
        }
    }
}

pub fn create_routes(db: PgPool, config: &AppConfig, tasks: TaskQueue) -> Router {
    build_router(AppState::new(db, config, tasks))
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::session_routes())
        .nest("/profile", profile::profile_routes())
        .nest("/health", measures::health_routes())
        .nest("/exercises", exercises::exercise_routes())
        .merge(sessions::session_routes())
        .nest("/workouts", workouts::workout_routes())
        .nest("/templates", templates::template_routes())
        .merge(plans::plan_routes())
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ));

    let api = Router::new()
        .merge(auth::public_routes())
        .merge(protected);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(security_headers_layer())
        .with_state(state)
}

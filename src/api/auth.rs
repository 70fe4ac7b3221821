use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use super::AppState;
use crate::auth::{
    AuthError, AuthResponse, ChangePasswordRequest, ForgottenPasswordRequest, LoginRequest, MessageResponse,
    RefreshTokenRequest, RegisterRequest, ResetPasswordRequest, TokenResponse, UserSession, VerifyAccountRequest,
    VerifyResetCodeRequest,
};
use crate::error::AppError;
use crate::models::UserResponse;

/// Routes reachable without a token
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/forgotten-password", post(forgotten_password))
        .route("/auth/forgotten-password/verify", post(verify_reset_code))
        .route("/auth/reset-password", post(reset_password))
}

/// Routes acting on the signed-in user
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/verify-token", post(verify_token))
        .route("/auth/verify-account", post(verify_account))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/change-password", post(change_password))
}

/// Register a new user
#[tracing::instrument(skip(state, request))]
async fn register(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login user
#[tracing::instrument(skip(state, request))]
async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state.auth.login(request).await?;
    Ok(Json(response))
}

/// Refresh access token
#[tracing::instrument(skip(state, request))]
async fn refresh_token(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RefreshTokenRequest>, AppError>,
) -> Result<Json<TokenResponse>, AuthError> {
    let response = state.auth.refresh_token(request).await?;
    Ok(Json(response))
}

/// Logout user
#[tracing::instrument(skip(state, session))]
async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<MessageResponse>, AuthError> {
    let response = state.auth.logout(&session).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, session))]
async fn verify_token(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state.auth.current_user(session.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[tracing::instrument(skip(state, session, request))]
async fn verify_account(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<VerifyAccountRequest>, AppError>,
) -> Result<Json<MessageResponse>, AuthError> {
    let response = state.auth.verify_account(&session, request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, session))]
async fn resend_verification(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<MessageResponse>, AuthError> {
    let response = state.auth.resend_verification(&session).await?;
    Ok(Json(response))
}

/// Mails a reset code; answers 204 once the code is queued
#[tracing::instrument(skip(state, request))]
async fn forgotten_password(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ForgottenPasswordRequest>, AppError>,
) -> Result<StatusCode, AuthError> {
    state.auth.forgotten_password(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, request))]
async fn verify_reset_code(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<VerifyResetCodeRequest>, AppError>,
) -> Result<Json<MessageResponse>, AuthError> {
    let response = state.auth.verify_reset_code(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(state, request))]
async fn reset_password(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ResetPasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>, AuthError> {
    let response = state.auth.reset_password(request).await?;
    Ok(Json(response))
}

/// Change user password
#[tracing::instrument(skip(state, session, request))]
async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<ChangePasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>, AuthError> {
    let response = state.auth.change_password(&session, request).await?;
    Ok(Json(response))
}

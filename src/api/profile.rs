use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::{Multipart, WithRejection};
use chrono::NaiveDate;

use super::{read_file_field, AppState, MAX_UPLOAD_BYTES};
use crate::auth::{MessageResponse, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{
    BirthdayRequest, GenderRequest, PictureResponse, ProfileDetails, ProfileField, TextFieldRequest,
    UsernameRequest,
};
use crate::services::profile_service::TextField;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile))
        .route("/full-name", get(get_full_name).put(set_full_name))
        .route("/bio", get(get_bio).put(set_bio))
        .route("/username", get(get_username).put(set_username))
        .route("/birthday", get(get_birthday).put(set_birthday))
        .route("/gender", get(get_gender).put(set_gender))
        .route(
            "/picture",
            get(get_picture)
                .post(upload_picture)
                .delete(delete_picture)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

#[tracing::instrument(skip(state, session))]
async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ProfileDetails>> {
    Ok(Json(state.profiles.get_profile(session.user_id).await?))
}

async fn get_full_name(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ProfileField<Option<String>>>> {
    Ok(Json(state.profiles.get_text_field(session.user_id, TextField::FullName).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_full_name(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<TextFieldRequest>, AppError>,
) -> AppResult<Json<ProfileField<Option<String>>>> {
    let field = state
        .profiles
        .set_text_field(session.user_id, TextField::FullName, request.value)
        .await?;
    Ok(Json(field))
}

async fn get_bio(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ProfileField<Option<String>>>> {
    Ok(Json(state.profiles.get_text_field(session.user_id, TextField::Bio).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_bio(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<TextFieldRequest>, AppError>,
) -> AppResult<Json<ProfileField<Option<String>>>> {
    let field = state
        .profiles
        .set_text_field(session.user_id, TextField::Bio, request.value)
        .await?;
    Ok(Json(field))
}

async fn get_username(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ProfileField<String>>> {
    Ok(Json(state.profiles.get_username(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_username(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<UsernameRequest>, AppError>,
) -> AppResult<Json<ProfileField<String>>> {
    Ok(Json(state.profiles.set_username(session.user_id, &request.username).await?))
}

async fn get_birthday(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ProfileField<Option<NaiveDate>>>> {
    Ok(Json(state.profiles.get_birthday(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_birthday(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<BirthdayRequest>, AppError>,
) -> AppResult<Json<ProfileField<Option<NaiveDate>>>> {
    Ok(Json(state.profiles.set_birthday(session.user_id, request.birthday).await?))
}

async fn get_gender(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ProfileField<Option<String>>>> {
    Ok(Json(state.profiles.get_gender(session.user_id).await?))
}

#[tracing::instrument(skip(state, session, request))]
async fn set_gender(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<GenderRequest>, AppError>,
) -> AppResult<Json<ProfileField<Option<String>>>> {
    Ok(Json(state.profiles.set_gender(session.user_id, &request.gender).await?))
}

async fn get_picture(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<PictureResponse>> {
    Ok(Json(state.profiles.get_picture(session.user_id).await?))
}

/// Accepts the image and uploads it in the background
#[tracing::instrument(skip(state, session, multipart))]
async fn upload_picture(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let (data, content_type) = read_file_field(multipart, "picture").await?;
    state
        .profiles
        .upload_picture(session.user_id, data, &content_type)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(MessageResponse::new("Profile picture upload started"))))
}

#[tracing::instrument(skip(state, session))]
async fn delete_picture(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<StatusCode> {
    state.profiles.delete_picture(session.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

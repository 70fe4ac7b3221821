// API routes and handlers

pub mod health;
pub mod routes;
pub mod auth;
pub mod profile;
pub mod measures;
pub mod exercises;
pub mod sessions;
pub mod workouts;
pub mod templates;
pub mod plans;

pub use routes::{build_router, create_routes, AppState};

use axum_extra::extract::Multipart;

use crate::error::{AppError, AppResult, FieldErrors};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Reads the named file field of a multipart body as `(bytes, content type)`.
pub(crate) async fn read_file_field(mut multipart: Multipart, field_name: &str) -> AppResult<(Vec<u8>, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Invalid multipart body: {}", err)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("Invalid multipart body: {}", err)))?;

        return Ok((data.to_vec(), content_type));
    }

    Err(FieldErrors::single(field_name, "No file was submitted.").into())
}

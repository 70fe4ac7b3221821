use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::{extract_bearer_token, AuthError, AuthService};

/// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let session = auth_service.validate_session(token).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// CORS configuration for the API
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Security headers middleware
pub fn security_headers_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    )
}

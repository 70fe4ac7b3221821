mod common;

use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

use common::{lazy_app, request, send};

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = lazy_app();

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "beast-physique");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = lazy_app();
    let id = uuid::Uuid::new_v4();

    let routes = [
        (Method::GET, "/api/v1/profile".to_string()),
        (Method::PUT, "/api/v1/profile/bio".to_string()),
        (Method::GET, "/api/v1/health/measures".to_string()),
        (Method::GET, "/api/v1/exercises/muscle-groups".to_string()),
        (Method::GET, format!("/api/v1/exercise-sessions/{}", id)),
        (Method::DELETE, format!("/api/v1/sets/{}", id)),
        (Method::GET, "/api/v1/workouts".to_string()),
        (Method::POST, format!("/api/v1/templates/{}/start", id)),
        (Method::GET, "/api/v1/plans/active".to_string()),
        (Method::GET, "/api/v1/routines".to_string()),
        (Method::POST, "/api/v1/auth/logout".to_string()),
    ];

    for (method, uri) in routes {
        let (status, body) = send(&app, request(method.clone(), &uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"], "Missing authorization header");
    }
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = lazy_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/workouts")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authorization header format");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = lazy_app();

    let (status, _) = send(&app, request(Method::GET, "/api/v1/workouts", None, Some("not-a-jwt"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let app = lazy_app();

    let response = app
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = lazy_app();

    let (status, _) = send(&app, request(Method::GET, "/api/v1/nothing-here", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_body_is_bad_request() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": 5, "username": "lifter", "password": "Heavy-Lifting-42" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");
    assert!(body["message"].as_str().unwrap().contains("email"));

    let broken = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");
}

#[tokio::test]
async fn test_missing_content_type_is_bad_request() {
    let app = lazy_app();

    let plain = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app, plain).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");
}

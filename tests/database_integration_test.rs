mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use serial_test::serial;
use uuid::Uuid;

use common::{
    app_for, builtin_exercises, exercise_child, fake_email, fake_username, register, request, send, set_item,
    test_pool, TEST_PASSWORD,
};

#[tokio::test]
#[serial]
async fn test_register_creates_unverified_user_with_profile() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());

    let user = register(&app).await;

    let is_verified: bool = sqlx::query_scalar("SELECT is_verified FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!is_verified);

    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(profiles, 1);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/profile/username", None, Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], user.username.as_str());
}

#[tokio::test]
#[serial]
async fn test_duplicate_email_and_username_are_field_errors() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool);

    let user = register(&app).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": user.email, "username": user.username, "password": TEST_PASSWORD })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["email"].is_array());
    assert!(body["fields"]["username"].is_array());

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": fake_email(), "username": fake_username(), "password": "12345678" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["password"].is_array());
}

#[tokio::test]
#[serial]
async fn test_workout_round_trip_keeps_order_and_totals() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let user = register(&app).await;
    let (squat, bench) = builtin_exercises(&pool).await;

    let body = json!({
        "name": "Push day",
        "exercises": [
            exercise_child(squat, vec![set_item(100.0, 5), set_item(100.0, 5)]),
            {
                "session_type": "superset",
                "notes": "no rest between",
                "exercises_data": [
                    { "exercise": { "id": bench }, "session_data": [set_item(60.0, 10)] },
                    { "exercise": { "id": squat }, "session_data": [] },
                ],
            },
            exercise_child(bench, vec![json!({ "type": "rest", "data": { "minutes": 2, "seconds": 0 } })]),
        ],
    });

    let (status, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);

    let id = created["id"].as_str().unwrap();
    let (status, workout) = send(&app, request(Method::GET, &format!("/api/v1/workouts/{}", id), None, Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::OK);

    let children = workout["exercises"].as_array().unwrap();
    let kinds: Vec<&str> = children.iter().map(|c| c["session_type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["exercise", "superset", "exercise"]);
    let positions: Vec<i64> = children.iter().map(|c| c["position"].as_i64().unwrap()).collect();
    assert_eq!(positions, vec![0, 1, 2]);

    let members: Vec<&str> = children[1]["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["exercise"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(members, vec![bench.to_string(), squat.to_string()]);

    assert_eq!(workout["total_exercises"], 3);
    assert_eq!(workout["total_sets"], 3);
    assert_eq!(workout["total_volume"].as_f64().unwrap(), 1600.0);
}

#[tokio::test]
#[serial]
async fn test_untouched_child_is_not_rewritten() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let user = register(&app).await;
    let (squat, bench) = builtin_exercises(&pool).await;

    let body = json!({
        "name": "Leg day",
        "exercises": [
            exercise_child(squat, vec![set_item(120.0, 3)]),
            exercise_child(bench, vec![set_item(80.0, 8)]),
        ],
    });
    let (_, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&user.access_token))).await;
    let workout_id = created["id"].as_str().unwrap().to_string();
    let first = created["exercises"][0].clone();
    let second = created["exercises"][1].clone();

    let keep = |child: &Value, weight: f64| {
        let item = &child["session_data"][0];
        json!({
            "session_type": "exercise",
            "id": child["id"],
            "exercise": { "id": child["exercise"]["id"] },
            "session_data": [{ "id": item["id"], "type": "set", "data": { "weight": weight, "reps": item["data"]["reps"] } }],
        })
    };
    let edit = json!({ "exercises": [keep(&first, 120.0), keep(&second, 90.0)] });

    let (status, edited) = send(
        &app,
        request(Method::PUT, &format!("/api/v1/workouts/{}", workout_id), Some(edit), Some(&user.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", edited);

    assert_eq!(edited["exercises"][0]["updated_at"], first["updated_at"]);
    assert_eq!(edited["exercises"][0]["session_data"][0]["updated_at"], first["session_data"][0]["updated_at"]);
    assert_eq!(edited["exercises"][1]["session_data"][0]["data"]["weight"].as_f64().unwrap(), 90.0);
    assert_eq!(edited["total_volume"].as_f64().unwrap(), 120.0 * 3.0 + 90.0 * 8.0);
}

#[tokio::test]
#[serial]
async fn test_unknown_child_id_is_rejected() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let user = register(&app).await;
    let (squat, _) = builtin_exercises(&pool).await;

    let body = json!({ "name": "Pull day", "exercises": [exercise_child(squat, vec![set_item(50.0, 10)])] });
    let (_, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&user.access_token))).await;
    let workout_id = created["id"].as_str().unwrap();

    let mut stray = exercise_child(squat, vec![]);
    stray["id"] = json!(Uuid::new_v4());
    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            &format!("/api/v1/workouts/{}", workout_id),
            Some(json!({ "exercises": [stray] })),
            Some(&user.access_token),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_foreign_set_delete_is_unauthorized() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let owner = register(&app).await;
    let stranger = register(&app).await;
    let (squat, _) = builtin_exercises(&pool).await;

    let body = json!({ "name": "Owner day", "exercises": [exercise_child(squat, vec![set_item(70.0, 6)])] });
    let (_, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&owner.access_token))).await;
    let set_id = created["exercises"][0]["session_data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, request(Method::DELETE, &format!("/api/v1/sets/{}", set_id), None, Some(&stranger.access_token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You can only delete your own sets.");

    let (status, _) = send(&app, request(Method::DELETE, &format!("/api/v1/rests/{}", set_id), None, Some(&owner.access_token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request(Method::DELETE, &format!("/api/v1/sets/{}", set_id), None, Some(&owner.access_token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[serial]
async fn test_plan_activation() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let user = register(&app).await;
    let (squat, bench) = builtin_exercises(&pool).await;

    let (status, _) = send(&app, request(Method::GET, "/api/v1/plans/active", None, Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = json!({
        "name": "Five by five",
        "workouts": [
            { "name": "A", "exercises": [exercise_child(squat, vec![set_item(100.0, 5)])] },
            { "name": "B", "exercises": [exercise_child(bench, vec![set_item(70.0, 5)])] },
        ],
    });
    let (status, plan) = send(&app, request(Method::POST, "/api/v1/plans", Some(body), Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", plan);
    assert_eq!(plan["total_workouts"], 2);

    let plan_id = plan["id"].as_str().unwrap();
    let (status, _) = send(&app, request(Method::POST, &format!("/api/v1/plans/{}/activate", plan_id), None, Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, active) = send(&app, request(Method::GET, "/api/v1/plans/active", None, Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["id"], plan["id"]);
    assert_eq!(active["is_active"], true);
}

#[tokio::test]
#[serial]
async fn test_workout_edit_removes_and_adds_children() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let user = register(&app).await;
    let (squat, bench) = builtin_exercises(&pool).await;

    let body = json!({
        "name": "Swap day",
        "exercises": [
            exercise_child(squat, vec![set_item(100.0, 5)]),
            exercise_child(bench, vec![set_item(60.0, 10)]),
        ],
    });
    let (_, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&user.access_token))).await;
    let workout_id = created["id"].as_str().unwrap().to_string();
    let dropped: Uuid = created["exercises"][0]["id"].as_str().unwrap().parse().unwrap();
    let kept = created["exercises"][1].clone();

    let edit = json!({
        "exercises": [
            {
                "session_type": "exercise",
                "id": kept["id"],
                "exercise": { "id": bench },
                "session_data": [{ "id": kept["session_data"][0]["id"], "type": "set", "data": { "weight": 60.0, "reps": 10 } }],
            },
            exercise_child(squat, vec![set_item(40.0, 12)]),
        ],
    });
    let (status, edited) = send(
        &app,
        request(Method::PUT, &format!("/api/v1/workouts/{}", workout_id), Some(edit), Some(&user.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", edited);

    let children = edited["exercises"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["id"], kept["id"]);
    assert_ne!(children[1]["id"].as_str().unwrap(), dropped.to_string());
    assert_eq!(children[1]["exercise"]["id"], squat.to_string());
    assert_eq!(edited["total_volume"].as_f64().unwrap(), 60.0 * 10.0 + 40.0 * 12.0);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercise_sessions WHERE id = $1")
        .bind(dropped)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[serial]
async fn test_set_edit_checks_owner_and_updates_totals() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let owner = register(&app).await;
    let stranger = register(&app).await;
    let (squat, _) = builtin_exercises(&pool).await;

    let body = json!({ "name": "Volume day", "exercises": [exercise_child(squat, vec![set_item(70.0, 6)])] });
    let (_, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&owner.access_token))).await;
    let workout_id = created["id"].as_str().unwrap().to_string();
    let set_id = created["exercises"][0]["session_data"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(created["total_volume"].as_f64().unwrap(), 420.0);

    let (status, body) = send(
        &app,
        request(Method::PUT, &format!("/api/v1/sets/{}", set_id), Some(json!({ "weight": 1, "reps": 1 })), Some(&stranger.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only edit your own sets.");

    let (status, item) = send(
        &app,
        request(Method::PUT, &format!("/api/v1/sets/{}", set_id), Some(json!({ "weight": 80, "reps": 6 })), Some(&owner.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", item);
    assert_eq!(item["data"]["weight"].as_f64().unwrap(), 80.0);

    let (_, workout) = send(&app, request(Method::GET, &format!("/api/v1/workouts/{}", workout_id), None, Some(&owner.access_token))).await;
    assert_eq!(workout["total_volume"].as_f64().unwrap(), 480.0);
    assert_eq!(workout["total_sets"], 1);
}

#[tokio::test]
#[serial]
async fn test_session_edit_without_items_is_rejected() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool.clone());
    let user = register(&app).await;
    let (squat, _) = builtin_exercises(&pool).await;

    let body = json!({ "name": "Notes day", "exercises": [exercise_child(squat, vec![set_item(100.0, 5), set_item(100.0, 3)])] });
    let (_, created) = send(&app, request(Method::POST, "/api/v1/workouts", Some(body), Some(&user.access_token))).await;
    let workout_id = created["id"].as_str().unwrap().to_string();
    let session_uri = format!("/api/v1/exercise-sessions/{}", created["exercises"][0]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        request(Method::PUT, &session_uri, Some(json!({ "notes": "grip slipped" })), Some(&user.access_token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");

    let (status, session) = send(&app, request(Method::GET, &session_uri, None, Some(&user.access_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["session_data"].as_array().unwrap().len(), 2);
    assert!(session["notes"].is_null());

    let (_, workout) = send(&app, request(Method::GET, &format!("/api/v1/workouts/{}", workout_id), None, Some(&user.access_token))).await;
    assert_eq!(workout["total_volume"].as_f64().unwrap(), 800.0);
}

#[tokio::test]
#[serial]
async fn test_malformed_path_id_is_bad_request() {
    let Some(pool) = test_pool().await else { return };
    let app = app_for(pool);
    let user = register(&app).await;

    let (status, body) = send(&app, request(Method::GET, "/api/v1/workouts/not-a-uuid", None, Some(&user.access_token))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad request");
}

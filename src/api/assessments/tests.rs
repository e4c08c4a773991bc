use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::AttemptStatus;
use crate::test_support;

#[tokio::test]
async fn start_attempt_creates_first_attempt() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        Some(10),
        50.0,
        3,
        vec![test_support::multiple_choice(1.0, "a", &["b"])],
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("start attempt");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["resumed"], false);
    assert_eq!(body["attempt_number"], 1);
    assert_eq!(body["status"], "in_progress");
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn second_start_resumes_with_200() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        Some(10),
        50.0,
        3,
        vec![test_support::multiple_choice(1.0, "a", &["b"])],
    )
    .await;

    let first = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("first start");
    let first = test_support::read_json(first).await;

    let second = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("second start");

    assert_eq!(second.status(), StatusCode::OK);
    let second = test_support::read_json(second).await;
    assert_eq!(second["resumed"], true);
    assert_eq!(second["id"], first["id"]);
}

#[tokio::test]
async fn exhausted_limit_returns_403() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        None,
        50.0,
        2,
        vec![test_support::multiple_choice(1.0, "a", &[])],
    )
    .await;
    test_support::insert_attempt(
        &ctx.store, "asm-1", "trainee-1", 1, AttemptStatus::Submitted, 60, None,
    )
    .await;
    test_support::insert_attempt(
        &ctx.store, "asm-1", "trainee-1", 2, AttemptStatus::Expired, 30, None,
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("start attempt");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "No attempts remaining");
}

#[tokio::test]
async fn unknown_assessment_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/missing/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("start attempt");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_trainee_id_returns_400() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        Some(10),
        50.0,
        3,
        vec![test_support::multiple_choice(1.0, "a", &["b"])],
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": ""})),
        ))
        .await
        .expect("start attempt");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn summary_reports_best_result_and_eligibility() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        Some(10),
        70.0,
        3,
        vec![test_support::multiple_choice(1.0, "a", &["b"])],
    )
    .await;

    let mut passed = test_support::insert_attempt(
        &ctx.store, "asm-1", "trainee-1", 1, AttemptStatus::Submitted, 60, None,
    )
    .await;
    passed.percentage = Some(80.0);
    passed.score = Some(0.8);
    passed.is_passed = Some(true);
    ctx.store.insert_attempt_unchecked(passed).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/assessments/asm-1/summary?trainee_id=trainee-1",
            None,
        ))
        .await
        .expect("summary");

    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["attempts_count"], 1);
    assert_eq!(body["best_percentage"], 80.0);
    assert_eq!(body["has_passed"], true);
    assert_eq!(body["can_attempt"], true);
    assert!(body["deny_reason"].is_null());
}

#[tokio::test]
async fn results_lists_every_trainee() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        Some(10),
        50.0,
        3,
        vec![test_support::multiple_choice(1.0, "a", &["b"])],
    )
    .await;
    test_support::insert_attempt(
        &ctx.store, "asm-1", "trainee-b", 1, AttemptStatus::Submitted, 60, None,
    )
    .await;
    test_support::insert_attempt(
        &ctx.store, "asm-1", "trainee-a", 1, AttemptStatus::InProgress, 2, Some(10),
    )
    .await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/assessments/asm-1/results",
            None,
        ))
        .await
        .expect("results");

    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    let trainees = body["trainees"].as_array().expect("trainees");
    assert_eq!(trainees.len(), 2);
    assert_eq!(trainees[0]["trainee_id"], "trainee-a");
    assert_eq!(trainees[0]["has_active_attempt"], true);
    assert_eq!(trainees[1]["trainee_id"], "trainee-b");
}

#[tokio::test]
async fn full_attempt_lifecycle_over_the_api() {
    let ctx = test_support::setup_test_context().await;
    test_support::seed_assessment(
        &ctx.store,
        "asm-1",
        Some(10),
        50.0,
        2,
        vec![
            test_support::multiple_choice(1.0, "a", &["b"]),
            test_support::checkbox(1.0, &["1", "2"], &["3"]),
        ],
    )
    .await;

    // First attempt: autosave one answer, submit the other alongside.
    let started = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("start");
    assert_eq!(started.status(), StatusCode::CREATED);
    let started = test_support::read_json(started).await;
    let attempt_id = started["id"].as_str().expect("attempt id").to_string();

    let saved = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/answers"),
            Some(json!({"question_id": "asm-1-q1", "answer": "a"})),
        ))
        .await
        .expect("autosave");
    assert_eq!(saved.status(), StatusCode::OK);

    let submitted = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            Some(json!({"answers": [{"question_id": "asm-1-q2", "answer": ["2", "1"]}]})),
        ))
        .await
        .expect("submit");
    assert_eq!(submitted.status(), StatusCode::OK);
    let submitted = test_support::read_json(submitted).await;
    assert_eq!(submitted["status"], "submitted");
    assert_eq!(submitted["percentage"], 100.0);
    assert_eq!(submitted["is_passed"], true);

    // Second attempt: submitted empty, failing.
    let second = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("second start");
    assert_eq!(second.status(), StatusCode::CREATED);
    let second = test_support::read_json(second).await;
    assert_eq!(second["attempt_number"], 2);
    let second_id = second["id"].as_str().expect("attempt id").to_string();

    let failed = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{second_id}/submit"),
            Some(json!({"answers": []})),
        ))
        .await
        .expect("second submit");
    let failed = test_support::read_json(failed).await;
    assert_eq!(failed["percentage"], 0.0);
    assert_eq!(failed["is_passed"], false);

    // Third start: both attempts spent.
    let third = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/asm-1/attempts",
            Some(json!({"trainee_id": "trainee-1"})),
        ))
        .await
        .expect("third start");
    assert_eq!(third.status(), StatusCode::FORBIDDEN);

    let summary = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/assessments/asm-1/summary?trainee_id=trainee-1",
            None,
        ))
        .await
        .expect("summary");
    let summary = test_support::read_json(summary).await;
    assert_eq!(summary["attempts_count"], 2);
    assert_eq!(summary["best_percentage"], 100.0);
    assert_eq!(summary["can_attempt"], false);
    assert_eq!(summary["deny_reason"], "attempt_limit_reached");

    // Lifecycle markers were recorded for both attempts.
    let store = ctx.flush_recorder().await;
    assert_eq!(store.security_event_count().await, 4);
}

use super::common::*;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::assessments::drafts::ReviewSubmission;
use crate::workflows::assessments::repository::InMemoryAssessmentRepository;
use crate::workflows::assessments::router::{assessment_router, save_review_handler};

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn creating_a_quiz_returns_created_envelope() {
    let (service, _, _) = build_service();
    let job = service.create_job_posting(job_draft()).expect("job");
    let router = assessment_router(Arc::new(service));

    let draft = quiz_draft(&job, crate::workflows::assessments::domain::QuizType::Technical, 100);
    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/quizzes",
            serde_json::to_value(&draft).expect("draft encodes"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["quiz"]["type"], "technical");
    assert_eq!(body["data"]["quiz"]["questions"][0]["type"], "multiple-choice");
}

#[tokio::test]
async fn invalid_quiz_is_unprocessable() {
    let (service, _, _) = build_service();
    let job = service.create_job_posting(job_draft()).expect("job");
    let router = assessment_router(Arc::new(service));

    let mut draft = quiz_draft(&job, crate::workflows::assessments::domain::QuizType::Technical, 100);
    draft.total_points = 0;
    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/quizzes",
            serde_json::to_value(&draft).expect("draft encodes"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .is_some_and(|message| message.contains("total_points")));
}

#[tokio::test]
async fn review_handler_returns_not_found_for_unknown_result() {
    let (service, _, _) = build_service();
    let response = save_review_handler::<InMemoryAssessmentRepository, StubEvaluator>(
        State(Arc::new(service)),
        Path("result-missing".to_string()),
        Ok(axum::Json(ReviewSubmission::default())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn review_route_reports_blended_score() {
    let (service, _, _) = build_service();
    let catalog = seed_catalog(&service);
    let result = service
        .record_attempt(attempt(
            &catalog.screen,
            &catalog.application,
            Some(70.0),
            Value::Null,
            at(2, 9),
        ))
        .expect("attempt");
    let router = assessment_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/quiz-results/{}/review", result.id.0),
            json!({"reviewed_score": 90, "reviewer_notes": "solid"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["final_score"], json!(80.0));
    assert_eq!(body["data"]["review"]["is_reviewed"], true);
}

#[tokio::test]
async fn report_route_enriches_interviews_by_default() {
    let (service, _, evaluator) = build_service();
    let catalog = seed_catalog(&service);
    record_interview(&service, &catalog, interview_answers());
    let router = assessment_router(Arc::new(service));

    let uri = format!(
        "/api/v1/applications/{}/jobs/{}/quiz-results",
        catalog.application.id.0, catalog.job.id.0
    );
    let response = router
        .clone()
        .oneshot(get_request(&format!("{uri}?enrich=false")))
        .await
        .expect("response");
    let body = read_json_body(response).await;
    assert!(body["data"]["rows"][0]["analysis"].is_null());
    assert_eq!(evaluator.calls(), 0);

    let response = router.oneshot(get_request(&uri)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["job_title"], "Backend Engineer");
    assert!(body["data"]["rows"][0]["analysis"].is_string());
    assert_eq!(body["data"]["rows"][0]["score"], json!(82.0));
    assert_eq!(body["data"]["summary"]["attempts"], 1);
    assert_eq!(evaluator.calls(), 1);
}

#[tokio::test]
async fn report_route_answers_empty_for_unknown_application() {
    let (service, _, _) = build_service();
    let catalog = seed_catalog(&service);
    let router = assessment_router(Arc::new(service));

    let response = router
        .oneshot(get_request(&format!(
            "/api/v1/applications/app-missing/jobs/{}/quiz-results",
            catalog.job.id.0
        )))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "application not found");
    assert_eq!(body["data"]["rows"], json!([]));
}

#[tokio::test]
async fn feedback_routes_gate_candidate_view() {
    let (service, _, _) = build_service();
    let catalog = seed_catalog(&service);
    let result = service
        .record_attempt(attempt(
            &catalog.screen,
            &catalog.application,
            Some(88.0),
            Value::Null,
            at(2, 9),
        ))
        .expect("attempt");
    let router = assessment_router(Arc::new(service));
    let feedback_uri = format!("/api/v1/quiz-results/{}/feedback", result.id.0);
    let candidate_uri = format!("{feedback_uri}?user_id={}", catalog.application.user_id.0);

    let response = router
        .clone()
        .oneshot(get_request(&candidate_uri))
        .await
        .expect("response");
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["released"], false);
    assert!(body["data"].get("score").is_none());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &feedback_uri,
            json!({"application_id": catalog.application.id.0}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["feedback_visible_to_candidate"], true);
    assert!(body["data"]["feedback_released_at"].is_string());

    let response = router
        .oneshot(get_request(&candidate_uri))
        .await
        .expect("response");
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["released"], true);
    assert_eq!(body["data"]["score"], json!(88.0));
}

#[tokio::test]
async fn ensure_route_reports_missing_analysis_without_failing() {
    let (service, _, _) = service_with(FailingEvaluator::default());
    let catalog = seed_catalog(&service);
    let result = record_interview(&service, &catalog, interview_answers());
    let router = assessment_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/quiz-results/{}/analysis/ensure", result.id.0),
            Value::Null,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn malformed_requests_still_get_an_envelope() {
    let (service, _, _) = build_service();
    let router = assessment_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/quizzes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"title\": "))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
    assert!(body["data"].is_null());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/job-postings",
            json!({"title": "Missing company"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json_body(response).await["success"], false);

    let response = router
        .oneshot(get_request("/api/v1/quiz-results/result-1/feedback"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["success"], false);
}

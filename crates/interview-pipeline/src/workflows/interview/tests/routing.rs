use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use crate::workflows::interview::analysis::AnalysisStage;
use crate::workflows::interview::domain::InterviewSettings;
use crate::workflows::interview::pipeline_router;

fn router(harness: &Harness) -> Router {
    pipeline_router(harness.service.clone())
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&payload).expect("serialize payload"),
        ))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn upload(content_type: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::post("/api/v1/media")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .expect("request builds")
}

async fn start_session(harness: &Harness, email: &str) -> String {
    let response = router(harness)
        .oneshot(post_json(
            &format!("/api/v1/interviews/{INTERVIEW}/sessions"),
            json!({ "candidate_email": email }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    payload["session_id"]
        .as_str()
        .expect("session id returned")
        .to_string()
}

#[tokio::test]
async fn start_returns_frozen_questions() {
    let harness = Harness::new(interview(2, InterviewSettings::default(), &[ADA]));

    let response = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/interviews/{INTERVIEW}/sessions"),
            json!({ "candidate_email": ADA, "candidate_name": "Ada" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["questions"].as_array().map(Vec::len), Some(2));
    assert_eq!(payload["questions"][0]["text"], "Question 1");
    assert_eq!(payload["settings"]["allow_retakes"], false);
}

#[tokio::test]
async fn start_maps_lookup_failures() {
    let harness = Harness::new(interview(1, InterviewSettings::default(), &[ADA]));

    let forbidden = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/interviews/{INTERVIEW}/sessions"),
            json!({ "candidate_email": OUTSIDER }),
        ))
        .await
        .expect("route executes");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(forbidden).await;
    assert_eq!(payload["retryable"], false);

    let missing = router(&harness)
        .oneshot(post_json(
            "/api/v1/interviews/int-unknown/sessions",
            json!({ "candidate_email": ADA }),
        ))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    start_session(&harness, ADA).await;
    let conflict = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/interviews/{INTERVIEW}/sessions"),
            json!({ "candidate_email": ADA }),
        ))
        .await
        .expect("route executes");
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn media_upload_validates_type_and_size() {
    let harness = Harness::new(interview(1, InterviewSettings::default(), &[ADA]));

    let accepted = router(&harness)
        .oneshot(upload("video/mp4", vec![1; 64]))
        .await
        .expect("route executes");
    assert_eq!(accepted.status(), StatusCode::CREATED);
    let payload = read_json_body(accepted).await;
    assert!(payload["media_ref"]
        .as_str()
        .is_some_and(|media| media.ends_with(".mp4")));

    let unsupported = router(&harness)
        .oneshot(upload("audio/wav", vec![1; 64]))
        .await
        .expect("route executes");
    assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(read_json_body(unsupported).await["retryable"], true);

    let oversized = router(&harness)
        .oneshot(upload("video/mp4", vec![1; 4096]))
        .await
        .expect("route executes");
    assert_eq!(oversized.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let empty = router(&harness)
        .oneshot(upload("video/mp4", Vec::new()))
        .await
        .expect("route executes");
    assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn full_candidate_flow_over_http() {
    let harness = Harness::new(interview(2, InterviewSettings::default(), &[ADA]));
    let session_id = start_session(&harness, ADA).await;

    let early = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/complete"),
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_eq!(early.status(), StatusCode::UNPROCESSABLE_ENTITY);

    for (index, score) in [(0, 0.8), (1, 0.6)] {
        let media = harness.recording(score);
        let mut telemetry = serde_json::to_value(clean_telemetry()).expect("telemetry json");
        telemetry["screen"]["tab_changes"] = json!(4);
        let response = router(&harness)
            .oneshot(post_json(
                &format!("/api/v1/sessions/{session_id}/answers/{index}"),
                json!({
                    "media_ref": media,
                    "duration_seconds": 50,
                    "telemetry": telemetry,
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["question_index"], index);
        assert_eq!(payload["analysis"]["flags"], json!(["excessive tab switching"]));
    }

    let out_of_range = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/answers/2"),
            json!({ "media_ref": harness.recording(0.5), "duration_seconds": 10 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(out_of_range.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let completed = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/complete"),
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_eq!(completed.status(), StatusCode::OK);
    let receipt = read_json_body(completed).await;
    assert_eq!(receipt["overall_score_pct"], 70.0);
    assert_eq!(receipt["rank"], 1);

    let ranking = router(&harness)
        .oneshot(get(&format!("/api/v1/interviews/{INTERVIEW}/ranking")))
        .await
        .expect("route executes");
    assert_eq!(ranking.status(), StatusCode::OK);
    let entries = read_json_body(ranking).await;
    assert_eq!(entries[0]["session_id"], session_id.as_str());
    assert_eq!(entries[0]["candidate_email"], ADA);
    assert_eq!(entries[0]["rank"], 1);

    let view = router(&harness)
        .oneshot(get(&format!("/api/v1/sessions/{session_id}")))
        .await
        .expect("route executes");
    let view = read_json_body(view).await;
    assert_eq!(view["state"], "completed");
    assert_eq!(view["behavior"]["flagged_answers"], 2);

    let results = router(&harness)
        .oneshot(get(&format!("/api/v1/interviews/{INTERVIEW}/results")))
        .await
        .expect("route executes");
    assert_eq!(results.status(), StatusCode::OK);
    let results = read_json_body(results).await;
    assert_eq!(results["title"], "Backend Engineer");
    assert_eq!(results["sessions"].as_array().map(Vec::len), Some(1));

    let again = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/complete"),
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn analysis_failure_is_a_retryable_bad_gateway() {
    let harness = Harness::with_timeout(
        interview(1, InterviewSettings::default(), &[ADA]),
        Duration::from_millis(20),
    );
    harness
        .capabilities
        .delay(AnalysisStage::Facial, Duration::from_millis(200));
    let session_id = start_session(&harness, ADA).await;

    let response = router(&harness)
        .oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/answers/0"),
            json!({ "media_ref": harness.recording(0.5), "duration_seconds": 10 }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["retryable"], true);
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("facial")));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let harness = Harness::new(interview(1, InterviewSettings::default(), &[ADA]));

    let response = router(&harness)
        .oneshot(get("/api/v1/sessions/sess-424242"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router(&harness)
        .oneshot(get("/api/v1/interviews/int-unknown/results"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

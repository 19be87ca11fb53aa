use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{InterviewId, MediaRef, SessionId};
use super::media::RejectionReason;
use super::monitoring::TelemetrySnapshot;
use super::repository::{InterviewRepository, MediaStore};
use super::service::{AnswerSubmission, InterviewPipelineService, PipelineError};
use super::sessions::SessionError;

#[derive(Debug, Deserialize)]
pub(crate) struct StartSessionRequest {
    pub(crate) candidate_email: String,
    #[serde(default)]
    pub(crate) candidate_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAnswerRequest {
    pub(crate) media_ref: MediaRef,
    pub(crate) duration_seconds: u32,
    #[serde(default)]
    pub(crate) telemetry: Option<TelemetrySnapshot>,
}

/// Router exposing the candidate pipeline and the employer result views.
pub fn pipeline_router<R, M>(service: Arc<InterviewPipelineService<R, M>>) -> Router
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    let upload_limit = service.upload_limit();
    Router::new()
        .route(
            "/api/v1/interviews/:interview_id/sessions",
            post(start_session_handler::<R, M>),
        )
        .route(
            "/api/v1/interviews/:interview_id/ranking",
            get(ranking_handler::<R, M>),
        )
        .route(
            "/api/v1/interviews/:interview_id/results",
            get(results_handler::<R, M>),
        )
        .route(
            "/api/v1/media",
            post(upload_media_handler::<R, M>).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/sessions/:session_id",
            get(session_handler::<R, M>),
        )
        .route(
            "/api/v1/sessions/:session_id/answers/:question_index",
            post(submit_answer_handler::<R, M>),
        )
        .route(
            "/api/v1/sessions/:session_id/complete",
            post(complete_handler::<R, M>),
        )
        .with_state(service)
}

pub(crate) async fn start_session_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    Path(interview_id): Path<String>,
    axum::Json(request): axum::Json<StartSessionRequest>,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    let interview_id = InterviewId(interview_id);
    match service.start_session(
        &interview_id,
        &request.candidate_email,
        request.candidate_name,
    ) {
        Ok(start) => {
            let payload = json!({
                "session_id": start.session_id,
                "title": start.interview.title,
                "questions": start.interview.questions,
                "settings": start.interview.settings,
                "superseded_session_id": start.superseded,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn upload_media_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    match service.upload_media(body.to_vec(), content_type) {
        Ok(media_ref) => {
            let payload = json!({ "media_ref": media_ref });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_answer_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    Path((session_id, question_index)): Path<(String, usize)>,
    axum::Json(request): axum::Json<SubmitAnswerRequest>,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    let submission = AnswerSubmission {
        question_index,
        media_ref: request.media_ref,
        duration_seconds: request.duration_seconds,
        telemetry: request.telemetry,
    };
    match service
        .submit_answer(&SessionId(session_id), submission)
        .await
    {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    match service.complete_session(&SessionId(session_id)).await {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn session_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    match service.session(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ranking_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    Path(interview_id): Path<String>,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    match service.ranking(&InterviewId(interview_id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn results_handler<R, M>(
    State(service): State<Arc<InterviewPipelineService<R, M>>>,
    Path(interview_id): Path<String>,
) -> Response
where
    R: InterviewRepository + 'static,
    M: MediaStore + 'static,
{
    match service.results(&InterviewId(interview_id)) {
        Ok(results) => (StatusCode::OK, axum::Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Session(error) => match error {
            SessionError::NotInvited { .. } => StatusCode::FORBIDDEN,
            SessionError::UnknownInterview(_) | SessionError::UnknownSession(_) => {
                StatusCode::NOT_FOUND
            }
            SessionError::AlreadyStarted { .. }
            | SessionError::RetakeNotAllowed { .. }
            | SessionError::SessionSuperseded(_)
            | SessionError::SessionAlreadyCompleted(_)
            | SessionError::DuplicateAnswer { .. } => StatusCode::CONFLICT,
            SessionError::NoQuestions(_)
            | SessionError::QuestionOutOfRange { .. }
            | SessionError::IncompleteAnswers { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        PipelineError::Rejected(rejected) => match rejected.reason {
            RejectionReason::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RejectionReason::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RejectionReason::Empty | RejectionReason::UnknownMedia(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        },
        PipelineError::Analysis(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Media(_) | PipelineError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(error: PipelineError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::Topic;
use super::repository::{AssessmentRepository, AuditSink};
use super::service::{AnswerSubmission, EligibilityService, EligibilityServiceError};
use crate::workflows::case::{CaseId, PersonId};

#[derive(Debug, Default, Deserialize)]
pub struct OpenTopicRequest {
    #[serde(default)]
    pub child: Option<PersonId>,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Router builder exposing the assessment questionnaire endpoints.
pub fn eligibility_router<R, A>(service: Arc<EligibilityService<R, A>>) -> Router
where
    R: AssessmentRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/cases/:case_id/eligibility/:topic",
            get(verdict_handler::<R, A>).post(open_handler::<R, A>),
        )
        .route(
            "/api/v1/cases/:case_id/eligibility/:topic/answers",
            post(answer_handler::<R, A>),
        )
        .with_state(service)
}

pub(crate) async fn open_handler<R, A>(
    State(service): State<Arc<EligibilityService<R, A>>>,
    Path((case_id, topic)): Path<(CaseId, Topic)>,
    axum::Json(request): axum::Json<OpenTopicRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AuditSink + 'static,
{
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    match service.open_topic(&case_id, topic, request.child, today) {
        Ok(evaluation) => (StatusCode::CREATED, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn verdict_handler<R, A>(
    State(service): State<Arc<EligibilityService<R, A>>>,
    Path((case_id, topic)): Path<(CaseId, Topic)>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AuditSink + 'static,
{
    match service.get_verdict(&case_id, topic) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn answer_handler<R, A>(
    State(service): State<Arc<EligibilityService<R, A>>>,
    Path((case_id, topic)): Path<(CaseId, Topic)>,
    axum::Json(submission): axum::Json<AnswerSubmission>,
) -> Response
where
    R: AssessmentRepository + 'static,
    A: AuditSink + 'static,
{
    match service.submit_answer(&case_id, topic, submission) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: EligibilityServiceError) -> Response {
    let status = match &error {
        EligibilityServiceError::Evaluation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EligibilityServiceError::CaseLocked { .. } => StatusCode::CONFLICT,
        EligibilityServiceError::TopicNotOpened { .. } => StatusCode::NOT_FOUND,
        EligibilityServiceError::Repository(_) | EligibilityServiceError::Audit(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

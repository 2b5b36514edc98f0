use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ProposedBenefitPeriod, WindowDraft, WindowId};
use super::repository::{BenefitPeriodRepository, WindowRepository};
use super::service::{BenefitPeriodService, PeriodServiceError};
use super::store::StoreError;
use crate::workflows::case::CaseId;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteWindowRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// Router builder exposing eligibility windows and benefit periods of a case.
pub fn period_router<W, B>(service: Arc<BenefitPeriodService<W, B>>) -> Router
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/cases/:case_id/eligibility-windows",
            get(list_windows_handler::<W, B>).post(save_window_handler::<W, B>),
        )
        .route(
            "/api/v1/cases/:case_id/eligibility-windows/:window_id/delete",
            post(delete_window_handler::<W, B>),
        )
        .route(
            "/api/v1/cases/:case_id/benefit-periods",
            get(list_periods_handler::<W, B>).post(replace_periods_handler::<W, B>),
        )
        .route(
            "/api/v1/cases/:case_id/benefit-periods/validate",
            post(validate_periods_handler::<W, B>),
        )
        .with_state(service)
}

pub(crate) async fn list_windows_handler<W, B>(
    State(service): State<Arc<BenefitPeriodService<W, B>>>,
    Path(case_id): Path<CaseId>,
) -> Response
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    match service.list_eligibility_windows(&case_id) {
        Ok(windows) => (StatusCode::OK, axum::Json(windows)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_window_handler<W, B>(
    State(service): State<Arc<BenefitPeriodService<W, B>>>,
    Path(case_id): Path<CaseId>,
    axum::Json(draft): axum::Json<WindowDraft>,
) -> Response
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    let status = if draft.id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    match service.upsert_eligibility_window(&case_id, draft) {
        Ok(outcome) => (status, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_window_handler<W, B>(
    State(service): State<Arc<BenefitPeriodService<W, B>>>,
    Path((case_id, window_id)): Path<(CaseId, WindowId)>,
    axum::Json(request): axum::Json<DeleteWindowRequest>,
) -> Response
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    match service.delete_eligibility_window(&case_id, window_id, request.note) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_periods_handler<W, B>(
    State(service): State<Arc<BenefitPeriodService<W, B>>>,
    Path(case_id): Path<CaseId>,
) -> Response
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    match service.list_benefit_periods(&case_id) {
        Ok(periods) => (StatusCode::OK, axum::Json(periods)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn replace_periods_handler<W, B>(
    State(service): State<Arc<BenefitPeriodService<W, B>>>,
    Path(case_id): Path<CaseId>,
    axum::Json(proposed): axum::Json<Vec<ProposedBenefitPeriod>>,
) -> Response
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    match service.replace_benefit_periods(&case_id, proposed) {
        Ok(periods) => (StatusCode::OK, axum::Json(periods)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn validate_periods_handler<W, B>(
    State(service): State<Arc<BenefitPeriodService<W, B>>>,
    Path(case_id): Path<CaseId>,
    axum::Json(proposed): axum::Json<Vec<ProposedBenefitPeriod>>,
) -> Response
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    match service.validate(&case_id, &proposed) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PeriodServiceError) -> Response {
    let status = match &error {
        PeriodServiceError::Validation(_)
        | PeriodServiceError::Store(StoreError::InvalidRange { .. })
        | PeriodServiceError::Store(StoreError::ImmutableBounds(_))
        | PeriodServiceError::Store(StoreError::Evaluation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        PeriodServiceError::CaseLocked { .. }
        | PeriodServiceError::Store(StoreError::WindowDeleted(_)) => StatusCode::CONFLICT,
        PeriodServiceError::Store(StoreError::NotFound(_))
        | PeriodServiceError::Store(StoreError::CaseMismatch { .. }) => StatusCode::NOT_FOUND,
        PeriodServiceError::Store(StoreError::Repository(_))
        | PeriodServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

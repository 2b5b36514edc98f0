use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tilleggsstonad::workflows::eligibility::{
    eligibility_router, AssessmentRepository, AuditSink, EligibilityService,
};
use tilleggsstonad::workflows::periods::{
    period_router, BenefitPeriodRepository, BenefitPeriodService, WindowRepository,
};

pub(crate) fn with_case_routes<R, A, W, B>(
    eligibility: Arc<EligibilityService<R, A>>,
    periods: Arc<BenefitPeriodService<W, B>>,
) -> axum::Router
where
    R: AssessmentRepository + 'static,
    A: AuditSink + 'static,
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    eligibility_router(eligibility)
        .merge(period_router(periods))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

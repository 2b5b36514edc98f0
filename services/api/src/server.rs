use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAssessmentRepository, InMemoryBenefitPeriodRepository, InMemoryCaseStatus,
    InMemoryRegistry, InMemoryWindowRepository, TracingAuditSink,
};
use crate::routes::with_case_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tilleggsstonad::config::AppConfig;
use tilleggsstonad::error::AppError;
use tilleggsstonad::telemetry;
use tilleggsstonad::workflows::eligibility::{EligibilityService, RuleCatalog};
use tilleggsstonad::workflows::periods::BenefitPeriodService;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(RuleCatalog::standard()?);
    info!(topics = catalog.topics().count(), "rule catalog loaded");

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let cases = Arc::new(InMemoryCaseStatus::default());
    let eligibility_service = Arc::new(EligibilityService::new(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(TracingAuditSink),
        catalog.clone(),
        Arc::new(InMemoryRegistry::default()),
        cases.clone(),
        config.rules,
    ));
    let period_service = Arc::new(BenefitPeriodService::new(
        Arc::new(InMemoryWindowRepository::default()),
        Arc::new(InMemoryBenefitPeriodRepository::default()),
        catalog,
        cases,
    ));

    let app = with_case_routes(eligibility_service, period_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "benefit case service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

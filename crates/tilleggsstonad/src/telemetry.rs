use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(
                    f,
                    "invalid log level/filter '{}': unable to build EnvFilter",
                    value
                )
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Tracing target carrying derivation audit records. Enabled at info whatever the configured level.
pub const AUDIT_TARGET: &str = "audit";

/// Install the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(&config.log_level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// Filter from `rust_log` when it parses, otherwise from `log_level`, with the audit target forced on.
pub fn build_filter(log_level: &str, rust_log: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    let filter = match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        _ => EnvFilter::try_new(log_level).map_err(|source| TelemetryError::EnvFilter {
            value: log_level.to_string(),
            source,
        })?,
    };
    let audit = format!("{AUDIT_TARGET}=info");
    let directive = audit
        .parse()
        .map_err(|source| TelemetryError::EnvFilter {
            value: audit.clone(),
            source,
        })?;
    Ok(filter.add_directive(directive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn enabled_under(filter: EnvFilter) -> (bool, bool) {
        let subscriber = tracing_subscriber::registry().with(filter);
        tracing::subscriber::with_default(subscriber, || {
            (
                tracing::enabled!(target: "audit", Level::INFO),
                tracing::enabled!(target: "tilleggsstonad", Level::INFO),
            )
        })
    }

    #[test]
    fn audit_records_survive_a_warn_level() {
        let filter = build_filter("warn", None).expect("filter builds");

        let (audit, other) = enabled_under(filter);

        assert!(audit);
        assert!(!other);
    }

    #[test]
    fn rust_log_cannot_silence_the_audit_target() {
        let filter = build_filter("info", Some("error")).expect("filter builds");

        let (audit, other) = enabled_under(filter);

        assert!(audit);
        assert!(!other);
    }

    #[test]
    fn invalid_rust_log_falls_back_to_the_configured_level() {
        let filter =
            build_filter("debug", Some("tilleggsstonad=loudest")).expect("filter builds");

        let (audit, other) = enabled_under(filter);

        assert!(audit);
        assert!(other);
    }

    #[test]
    fn invalid_configured_level_is_reported() {
        let error = build_filter("tilleggsstonad=loudest", None).expect_err("level rejected");

        assert!(matches!(error, TelemetryError::EnvFilter { .. }));
    }
}

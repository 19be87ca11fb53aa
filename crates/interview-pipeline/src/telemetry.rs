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
                    "invalid log filter '{}' in APP_LOG_LEVEL: unable to build EnvFilter",
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

/// Dependencies whose debug output drowns the per-stage analysis events.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "axum_prometheus=warn"];

/// Expand a bare level such as `debug` into a filter that keeps HTTP plumbing at `warn`.
/// Anything that already carries directives is used as written.
pub fn filter_directives(log_level: &str) -> String {
    let log_level = log_level.trim();
    if log_level.contains('=') || log_level.contains(',') {
        return log_level.to_string();
    }
    std::iter::once(log_level)
        .chain(QUIET_DEPENDENCIES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn configured_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter_directives(&config.log_level)).map_err(|source| {
        TelemetryError::EnvFilter {
            value: config.log_level.clone(),
            source,
        }
    })
}

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence over the configured
/// log level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured_filter(config)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_quiets_http_plumbing() {
        assert_eq!(
            filter_directives(" debug "),
            "debug,hyper=warn,axum_prometheus=warn"
        );
    }

    #[test]
    fn explicit_directives_are_kept() {
        assert_eq!(
            filter_directives("interview_pipeline=trace"),
            "interview_pipeline=trace"
        );
        assert_eq!(filter_directives("info,hyper=debug"), "info,hyper=debug");
    }

    #[test]
    fn configured_filter_accepts_levels() {
        let config = TelemetryConfig {
            log_level: "info".to_string(),
        };
        assert!(configured_filter(&config).is_ok());
    }
}

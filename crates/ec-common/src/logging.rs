//! Structured Logging
//!
//! Two output modes selected by `LOG_FORMAT`:
//! - `json`: one JSON object per event, for log shipping
//! - anything else: compact human-readable lines for local development
//!
//! Level filtering comes from `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=ec_platform=debug,tower_http=info`.
//!
//! ```rust,ignore
//! ec_common::logging::init_logging("ec-server");
//! tracing::info!(appointment_id = %id, "Appointment booked");
//! ```

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Subsequent calls are ignored.
pub fn init_logging(service_name: &str) {
    let format = LogFormat::from_env();
    if try_init_logging(format).is_ok() {
        tracing::info!(service = service_name, ?format, "Logging initialized");
    }
}

/// Install the global subscriber with an explicit format.
pub fn try_init_logging(format: LogFormat) -> Result<(), TryInitError> {
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter())
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .flatten_event(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_target(true).with_ansi(true))
            .try_init(),
    }
}

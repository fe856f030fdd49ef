//! Logging setup with correlation fields on every line
//!
//! ```text
//! [correlation-id=3f2c...] 2024-05-01T10:00:00Z  INFO order_service: order accepted
//! ```

use crate::error::BoxError;
use crate::scope;
use std::fmt::Write as _;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{Format, Writer};
use tracing_subscriber::fmt::{format, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Event formatter that prefixes each line with the current log context
/// fields, then delegates to `inner`.
#[derive(Debug, Clone)]
pub struct CorrelationFormat<F = Format> {
    inner: F,
}

impl CorrelationFormat {
    pub fn new() -> Self {
        Self::wrapping(format())
    }
}

impl Default for CorrelationFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> CorrelationFormat<F> {
    pub fn wrapping(inner: F) -> Self {
        Self { inner }
    }
}

impl<S, N, F> FormatEvent<S, N> for CorrelationFormat<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let fields = scope::try_fields();
        if !fields.is_empty() {
            writer.write_char('[')?;
            for (i, (key, value)) in fields.iter().enumerate() {
                if i > 0 {
                    writer.write_char(' ')?;
                }
                write!(writer, "{key}={value}")?;
            }
            writer.write_str("] ")?;
        }
        self.inner.format_event(ctx, writer, event)
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info,correlation_id=debug`
    pub filter: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RUST_LOG`: filter directives (default: info)
    /// - `LOG_WITH_TARGET`: include the event target (true/false, default: true)
    pub fn from_env() -> Self {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let with_target = std::env::var("LOG_WITH_TARGET")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Self {
            filter,
            with_target,
        }
    }
}

/// Install the global subscriber.
///
/// Fails instead of panicking when the filter is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), BoxError> {
    let env_filter = EnvFilter::try_new(&config.filter)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .event_format(CorrelationFormat::wrapping(
            format().with_target(config.with_target),
        ))
        .try_init()?;

    tracing::info!(filter = %config.filter, "Tracing initialized");
    Ok(())
}

use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::protocol::events::FinishReason;

/// Map a config log level to an `EnvFilter` directive.
///
/// Returns `None` for "DISABLED".
#[must_use]
pub fn filter_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
///
/// Logs go to stderr; stdout carries the event stream.
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let Some(directive) = filter_directive(log_level) else {
        return;
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Log the outcome of one agent stream.
pub fn log_stream_complete(agent: &str, reason: FinishReason, events: usize, start: Instant) {
    tracing::info!(
        agent = agent,
        finish_reason = ?reason,
        events = events,
        duration_ms = start.elapsed().as_millis() as u64,
        "agent stream complete"
    );
}

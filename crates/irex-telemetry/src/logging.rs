//! Structured logging with JSON or pretty output.
//!
//! Logs always go to stderr; stdout is reserved for command output such
//! as IR JSON.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Build the env filter from config or RUST_LOG
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names emitted by the compiler pipeline.
pub mod events {
    /// Specification files were discovered under a directory.
    pub const FILES_DISCOVERED: &str = "files_discovered";

    /// A pipeline stage finished.
    pub const STAGE_COMPLETED: &str = "stage_completed";

    /// The pipeline stopped because a stage reported errors.
    pub const PIPELINE_HALTED: &str = "pipeline_halted";

    /// The IR bundle was assembled.
    pub const IR_ASSEMBLED: &str = "ir_assembled";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_files_discovered {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::FILES_DISCOVERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_stage_completed {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::STAGE_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_pipeline_halted {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::PIPELINE_HALTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_ir_assembled {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::IR_ASSEMBLED,
            $($field)*
        )
    };
}

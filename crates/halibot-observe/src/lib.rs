//! Observability setup for Halibot: structured logging and optional
//! OpenTelemetry trace export.

pub mod tracing_setup;

//! Error types and result aliases for the Tracelink library.
//!
//! This module defines the core error type [`TracelinkError`] and the [`Result`] type alias
//! used throughout the library. Instrumentation errors are local by design: they are logged
//! or routed to a configured exception logger, never surfaced into the host call path.

use crate::run::RunId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracelinkError {
    /// A start event arrived for a run id that already has a live span.
    /// Defensive only; a correct host hands out unique ids per run.
    #[error("duplicate run id: {0}")]
    DuplicateRun(RunId),

    /// Lookup failed for a run id that was never started or already closed.
    #[error("no live span for run id: {0}")]
    CorrelationMiss(RunId),

    #[error("malformed trace context: {0}")]
    InvalidTraceContext(String),

    /// A failure internal to span creation, closure, or injection that was
    /// contained at an interception boundary.
    #[error("instrumentation fault: {0}")]
    InstrumentationFault(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TracelinkError>;

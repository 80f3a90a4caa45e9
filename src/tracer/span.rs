//! The tracer and span capability traits
//!
//! These traits are the seam between the correlation engine and the host's
//! tracing backend. The engine holds spans as `Box<dyn SpanHandle>` inside
//! registry entries shared across threads, so the handle methods take `&self`
//! and implementations use interior mutability.

use super::context::TraceContext;
use crate::run::RunKind;
use serde::{Deserialize, Serialize};

/// Terminal status recorded when a span ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpanStatus {
    Ok,
    Error { message: String },
}

impl SpanStatus {
    /// Build an error status from any displayable error
    pub fn error(message: impl Into<String>) -> Self {
        SpanStatus::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error { .. })
    }
}

/// Owned handle to one live span.
///
/// Attributes may be set at any time before the span ends. Ending is
/// idempotent: the first call records the terminal status, later calls are
/// ignored.
pub trait SpanHandle: Send + Sync {
    /// The identifying context of this span, fixed at creation
    fn context(&self) -> &TraceContext;

    /// Attach or overwrite an attribute
    fn set_attribute(&self, key: &str, value: serde_json::Value);

    /// End the span with a terminal status
    fn end(&self, status: SpanStatus);
}

/// The capability a tracing backend exposes to the correlation engine.
///
/// Starting a span must not fail and must not block; backends own their
/// context fabric (id generation, sampling decisions) entirely.
pub trait Tracer: Send + Sync {
    /// Start a span, as a child of `parent` when given, else as a trace root
    fn start_span(
        &self,
        name: &str,
        kind: RunKind,
        parent: Option<&TraceContext>,
    ) -> Box<dyn SpanHandle>;
}

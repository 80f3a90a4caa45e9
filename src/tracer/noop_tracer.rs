//! Null tracer implementation following the Null Object Pattern
//!
//! This module provides a NoopTracer that implements the tracer capability
//! but performs no operations. Hosts that disable instrumentation can keep
//! the correlation engine wired in without conditional checks: spans carry
//! an invalid context, so the propagator injects nothing.

use super::context::TraceContext;
use super::span::{SpanHandle, SpanStatus, Tracer};
use crate::run::RunKind;

/// A no-op tracer that silently discards all span operations
pub struct NoopTracer;

impl NoopTracer {
    /// Create a new noop tracer
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for NoopTracer {
    fn start_span(
        &self,
        _name: &str,
        _kind: RunKind,
        _parent: Option<&TraceContext>,
    ) -> Box<dyn SpanHandle> {
        Box::new(NoopSpan {
            context: TraceContext::invalid(),
        })
    }
}

/// Span handle that discards everything; its context identifies nothing
struct NoopSpan {
    context: TraceContext,
}

impl SpanHandle for NoopSpan {
    fn context(&self) -> &TraceContext {
        &self.context
    }

    fn set_attribute(&self, _key: &str, _value: serde_json::Value) {
        // Do nothing
    }

    fn end(&self, _status: SpanStatus) {
        // Do nothing
    }
}

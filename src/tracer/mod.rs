//! The tracer capability consumed by the correlation engine
//!
//! Tracelink does not export spans itself. It drives a minimal tracer
//! capability supplied by the host: start a span (optionally under a parent
//! context), attach attributes, and end it exactly once with a terminal
//! status. Anything beyond that — batching, sampling, wire formats — belongs
//! to the backend behind the trait.
//!
//! # Components
//!
//! - **TraceContext**: the identifying state (trace id, span id, flags) that
//!   crosses process boundaries, with the W3C `traceparent` text codec
//! - **Tracer / SpanHandle**: the capability traits the backend implements
//! - **NoopTracer**: null object for disabled instrumentation
//! - **RecordingTracer**: thread-safe in-memory backend for tests and demos
//!
//! # Usage Example
//!
//! ```rust
//! use tracelink::run::RunKind;
//! use tracelink::tracer::{RecordingTracer, SpanStatus, Tracer};
//! use std::sync::Arc;
//!
//! let tracer = Arc::new(RecordingTracer::new());
//!
//! let parent = tracer.start_span("pipeline", RunKind::Chain, None);
//! let child = tracer.start_span("completion", RunKind::Llm, Some(parent.context()));
//!
//! child.end(SpanStatus::Ok);
//! parent.end(SpanStatus::Ok);
//!
//! assert_eq!(tracer.len(), 2);
//! ```

pub mod context;
pub mod noop_tracer;
pub mod recording_tracer;
pub mod span;

// Re-export main types
pub use context::{TraceContext, TRACEPARENT_HEADER};
pub use noop_tracer::NoopTracer;
pub use recording_tracer::{FinishedSpan, RecordingTracer};
pub use span::{SpanHandle, SpanStatus, Tracer};

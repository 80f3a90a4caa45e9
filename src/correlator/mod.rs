//! The span correlation engine
//!
//! This is the core of the crate: a registry of live spans keyed by run id,
//! the correlator that drives span creation and closure from lifecycle
//! events, and the propagator that carries the active trace context across
//! outbound network calls.
//!
//! # Components
//!
//! - **SpanRegistry / SpanHolder**: concurrent store of live spans and
//!   their correlation metadata
//! - **SpanCorrelator**: consumes start/end/error events and reconstructs
//!   the execution tree, one span per run
//! - **ContextPropagator**: derives W3C `traceparent` headers from a run's
//!   live span for outbound requests
//!
//! # Usage Example
//!
//! ```rust
//! use tracelink::correlator::{ContextPropagator, SpanCorrelator};
//! use tracelink::run::RunId;
//! use tracelink::tracer::RecordingTracer;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! let correlator = SpanCorrelator::new(Arc::new(RecordingTracer::new()));
//! let propagator = ContextPropagator::new(correlator.registry());
//!
//! let chain = RunId::from(Uuid::new_v4());
//! correlator.on_chain_start(chain, None, "pipeline", HashMap::new());
//!
//! let headers = propagator.inject_context(&chain, HashMap::new());
//! assert!(headers.contains_key("traceparent"));
//!
//! correlator.on_end(chain, HashMap::new());
//! ```

pub mod handler;
pub mod propagation;
pub mod registry;

// Re-export main types
pub use handler::{CorrelatorConfig, ExceptionLogger, SpanCorrelator, CORRELATOR_TAG};
pub use propagation::ContextPropagator;
pub use registry::{SpanHolder, SpanRegistry};

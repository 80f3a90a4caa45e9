pub mod callback;
pub mod correlator;
pub mod error;
pub mod instrument;
pub mod run;
pub mod tracer;

pub use error::{Result, TracelinkError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::callback::{CallbackHandler, CallbackManager, HandlerTag};
    pub use crate::correlator::{
        ContextPropagator, CorrelatorConfig, SpanCorrelator, SpanRegistry,
    };
    pub use crate::error::{Result, TracelinkError};
    pub use crate::instrument::{ensure_attached, Instrumentor};
    pub use crate::run::{LifecycleEvent, RunId, RunKind};
    pub use crate::tracer::{
        NoopTracer, RecordingTracer, SpanStatus, TraceContext, Tracer, TRACEPARENT_HEADER,
    };
}

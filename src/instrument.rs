//! Interception points wiring the correlator into a host runtime.
//!
//! The instrumentor replaces runtime patching with two explicit hooks the
//! host composes in: a construction hook that attaches the correlator to
//! each new callback manager exactly once, and an outbound-completion hook
//! that injects trace context into a request's extra headers before
//! delegating to the host's own call. Neither hook may alter what the host
//! observes beyond the added headers.

use crate::callback::{CallbackHandler, CallbackManager};
use crate::correlator::handler::panic_message;
use crate::correlator::{ContextPropagator, CorrelatorConfig, SpanCorrelator};
use crate::error::TracelinkError;
use crate::run::RunId;
use crate::tracer::Tracer;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Register `handler` on the manager unless one of its kind is already
/// present.
///
/// Construction wrapping can fire repeatedly for the same logical scope
/// (inheritance chains, library-internal re-construction); this guard
/// keeps the handler list at exactly one instance per tag for any number
/// of invocations.
pub fn ensure_attached(manager: &mut CallbackManager, handler: Arc<dyn CallbackHandler>) {
    if manager.has_handler(handler.tag()) {
        return;
    }
    manager.add_inheritable_handler(handler);
}

/// Composition root for instrumenting one host runtime.
///
/// Owns the shared correlator and the propagator over its registry, and
/// exposes the two interception points the host calls into.
///
/// # Examples
///
/// ```
/// use tracelink::callback::CallbackManager;
/// use tracelink::instrument::Instrumentor;
/// use tracelink::tracer::RecordingTracer;
/// use std::sync::Arc;
///
/// let instrumentor = Instrumentor::new(Arc::new(RecordingTracer::new()));
///
/// let mut manager = CallbackManager::new();
/// instrumentor.on_manager_constructed(&mut manager);
/// assert_eq!(manager.inheritable_handlers().len(), 1);
/// ```
pub struct Instrumentor {
    correlator: Arc<SpanCorrelator>,
    propagator: ContextPropagator,
}

impl Instrumentor {
    /// Build an instrumentor over the given tracer backend
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self::with_config(tracer, CorrelatorConfig::default())
    }

    /// Build an instrumentor with explicit correlator configuration
    pub fn with_config(tracer: Arc<dyn Tracer>, config: CorrelatorConfig) -> Self {
        let correlator = Arc::new(SpanCorrelator::with_config(tracer, config));
        let propagator = ContextPropagator::new(correlator.registry());
        Self {
            correlator,
            propagator,
        }
    }

    /// The shared correlator, for hosts that deliver events directly
    pub fn correlator(&self) -> Arc<SpanCorrelator> {
        Arc::clone(&self.correlator)
    }

    /// The propagator over the correlator's registry
    pub fn propagator(&self) -> &ContextPropagator {
        &self.propagator
    }

    /// Construction hook: called after the host builds a callback manager
    pub fn on_manager_constructed(&self, manager: &mut CallbackManager) {
        ensure_attached(manager, self.correlator());
    }

    /// Outbound-completion hook: inject trace context, then delegate.
    ///
    /// Merges the run's trace context into `extra_headers` and invokes
    /// `call` with the resulting mapping, returning exactly what it
    /// returns. Injection faults are contained and routed to the
    /// configured exception logger; the call still runs with the headers
    /// it had.
    pub fn wrap_completion<T, E, F>(
        &self,
        run_id: RunId,
        extra_headers: &mut HashMap<String, String>,
        call: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&HashMap<String, String>) -> Result<T, E>,
    {
        let snapshot = extra_headers.clone();
        match panic::catch_unwind(AssertUnwindSafe(|| {
            self.propagator.inject_context(&run_id, snapshot)
        })) {
            Ok(headers) => *extra_headers = headers,
            Err(payload) => {
                let fault = TracelinkError::InstrumentationFault(panic_message(payload));
                self.correlator.report_fault(&fault);
            }
        }

        call(extra_headers)
    }
}

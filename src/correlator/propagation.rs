//! Trace-context propagation across the outbound network boundary
//!
//! When the host is about to perform a downstream request for a run, the
//! propagator looks the run up in the registry and merges the W3C
//! `traceparent` carrier into the request's headers, so the downstream
//! service continues the same trace. A miss leaves the headers untouched;
//! propagation failure never aborts an outbound call.

use super::registry::SpanRegistry;
use crate::run::RunId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Derives injectable trace-context headers from the live span of a run.
///
/// Injection is a pure function of the current registry state and the
/// input map: it creates no spans and mutates nothing in the registry.
pub struct ContextPropagator {
    registry: Arc<SpanRegistry>,
}

impl ContextPropagator {
    /// Create a propagator over a registry shared with the correlator
    pub fn new(registry: Arc<SpanRegistry>) -> Self {
        Self { registry }
    }

    /// Merge the run's trace context into the given header mapping.
    ///
    /// Existing keys not touched by injection are preserved; a conflicting
    /// `traceparent` key is overwritten. When the run id has no live span,
    /// or its backend yields an invalid (all-zero) context, the mapping is
    /// returned unchanged.
    pub fn inject_context(
        &self,
        run_id: &RunId,
        mut headers: HashMap<String, String>,
    ) -> HashMap<String, String> {
        match self.registry.get(run_id) {
            Some(holder) if holder.context().is_valid() => {
                holder.context().inject(&mut headers);
            }
            Some(_) => {
                debug!("run {} has no identifying context; headers unchanged", run_id);
            }
            None => {
                debug!("no live span for run {}; headers unchanged", run_id);
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::registry::SpanHolder;
    use crate::run::RunKind;
    use crate::tracer::{NoopTracer, RecordingTracer, Tracer, TRACEPARENT_HEADER};
    use uuid::Uuid;

    fn registry_with_run(tracer: &dyn Tracer) -> (Arc<SpanRegistry>, RunId) {
        let registry = Arc::new(SpanRegistry::new());
        let run_id = RunId::from(Uuid::new_v4());
        let span = tracer.start_span("completion", RunKind::Llm, None);
        registry
            .put(run_id, Arc::new(SpanHolder::new(span, None)))
            .unwrap();
        (registry, run_id)
    }

    #[test]
    fn test_inject_adds_traceparent_for_live_run() {
        let tracer = RecordingTracer::new();
        let (registry, run_id) = registry_with_run(&tracer);
        let expected = registry.get(&run_id).unwrap().context().to_traceparent();

        let propagator = ContextPropagator::new(registry);
        let headers = propagator.inject_context(&run_id, HashMap::new());

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[TRACEPARENT_HEADER], expected);
    }

    #[test]
    fn test_inject_preserves_unrelated_keys_and_overwrites_stale_context() {
        let tracer = RecordingTracer::new();
        let (registry, run_id) = registry_with_run(&tracer);
        let expected = registry.get(&run_id).unwrap().context().to_traceparent();

        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer token".to_string());
        headers.insert(TRACEPARENT_HEADER.to_string(), "stale".to_string());

        let propagator = ContextPropagator::new(registry);
        let headers = propagator.inject_context(&run_id, headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["authorization"], "Bearer token");
        assert_eq!(headers[TRACEPARENT_HEADER], expected);
    }

    #[test]
    fn test_inject_is_idempotent_for_fixed_registry_state() {
        let tracer = RecordingTracer::new();
        let (registry, run_id) = registry_with_run(&tracer);
        let propagator = ContextPropagator::new(registry);

        let first = propagator.inject_context(&run_id, HashMap::new());
        let second = propagator.inject_context(&run_id, first.clone());

        assert_eq!(first, second);
    }

    #[test]
    fn test_inject_on_miss_is_identity() {
        let propagator = ContextPropagator::new(Arc::new(SpanRegistry::new()));

        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let result = propagator.inject_context(&RunId::from(Uuid::new_v4()), headers.clone());
        assert_eq!(result, headers);
    }

    #[test]
    fn test_inject_skips_invalid_noop_context() {
        let tracer = NoopTracer::new();
        let (registry, run_id) = registry_with_run(&tracer);

        let propagator = ContextPropagator::new(registry);
        let headers = propagator.inject_context(&run_id, HashMap::new());

        assert!(headers.is_empty());
    }
}

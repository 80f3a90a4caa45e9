//! Concurrent store of live spans keyed by run id
//!
//! The registry is the only shared mutable state in the correlation engine.
//! Each entry is independent; there are no cross-key transactions, and every
//! operation completes in a bounded critical section so host threads are
//! never held up.

use crate::error::{Result, TracelinkError};
use crate::run::RunId;
use crate::tracer::{SpanHandle, TraceContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// One live span and the metadata needed to correlate its relatives.
///
/// Exactly one holder exists per live run id. The context is cloned from the
/// span at creation and never mutated afterwards; it serves both child-span
/// creation and header injection.
pub struct SpanHolder {
    span: Box<dyn SpanHandle>,
    parent_run_id: Option<RunId>,
    context: TraceContext,
    started_at: f64,
}

impl SpanHolder {
    /// Wrap a freshly started span
    pub fn new(span: Box<dyn SpanHandle>, parent_run_id: Option<RunId>) -> Self {
        let context = span.context().clone();
        Self {
            span,
            parent_run_id,
            context,
            started_at: current_timestamp(),
        }
    }

    /// The owned span handle
    pub fn span(&self) -> &dyn SpanHandle {
        self.span.as_ref()
    }

    /// The run id of the logical parent, if the run is not a trace root
    pub fn parent_run_id(&self) -> Option<RunId> {
        self.parent_run_id
    }

    /// The span's identifying context
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// Unix timestamp when the holder was created
    pub fn started_at(&self) -> f64 {
        self.started_at
    }
}

/// Mapping of run id to live span holder, safe for arbitrary concurrent
/// callers
pub struct SpanRegistry {
    runs: Mutex<HashMap<RunId, Arc<SpanHolder>>>,
}

impl SpanRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a holder for a run id not yet present.
    ///
    /// Fails with [`TracelinkError::DuplicateRun`] when the id already has a
    /// live holder; the map is left unchanged in that case.
    pub fn put(&self, run_id: RunId, holder: Arc<SpanHolder>) -> Result<()> {
        let mut runs = self.runs.lock().unwrap();
        if runs.contains_key(&run_id) {
            return Err(TracelinkError::DuplicateRun(run_id));
        }
        runs.insert(run_id, holder);
        Ok(())
    }

    /// Insert unconditionally, returning the displaced holder if any
    pub fn replace(&self, run_id: RunId, holder: Arc<SpanHolder>) -> Option<Arc<SpanHolder>> {
        self.runs.lock().unwrap().insert(run_id, holder)
    }

    /// Look up the holder for a run id; absence is a miss, never an error
    pub fn get(&self, run_id: &RunId) -> Option<Arc<SpanHolder>> {
        self.runs.lock().unwrap().get(run_id).cloned()
    }

    /// Remove and return the holder for a run id.
    ///
    /// Idempotent: removing an absent id returns a miss so out-of-order or
    /// duplicate end events cannot crash the pipeline.
    pub fn remove(&self, run_id: &RunId) -> Option<Arc<SpanHolder>> {
        self.runs.lock().unwrap().remove(run_id)
    }

    /// Number of live holders
    pub fn len(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Check whether any holders are live
    pub fn is_empty(&self) -> bool {
        self.runs.lock().unwrap().is_empty()
    }
}

impl Default for SpanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current timestamp as Unix timestamp (seconds since epoch)
fn current_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunKind;
    use crate::tracer::{RecordingTracer, Tracer};
    use uuid::Uuid;

    fn holder(tracer: &RecordingTracer, parent: Option<RunId>) -> Arc<SpanHolder> {
        let span = tracer.start_span("test", RunKind::Chain, None);
        Arc::new(SpanHolder::new(span, parent))
    }

    #[test]
    fn test_put_and_get() {
        let tracer = RecordingTracer::new();
        let registry = SpanRegistry::new();
        let run_id = RunId::from(Uuid::new_v4());

        registry.put(run_id, holder(&tracer, None)).unwrap();

        let found = registry.get(&run_id).unwrap();
        assert!(found.context().is_valid());
        assert_eq!(found.parent_run_id(), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_put_duplicate_fails_and_keeps_original() {
        let tracer = RecordingTracer::new();
        let registry = SpanRegistry::new();
        let run_id = RunId::from(Uuid::new_v4());

        let first = holder(&tracer, None);
        let first_span_id = first.context().span_id().to_string();
        registry.put(run_id, first).unwrap();

        let err = registry.put(run_id, holder(&tracer, None)).unwrap_err();
        match err {
            TracelinkError::DuplicateRun(id) => assert_eq!(id, run_id),
            _ => panic!("Expected DuplicateRun"),
        }

        assert_eq!(registry.get(&run_id).unwrap().context().span_id(), first_span_id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replace_returns_displaced_holder() {
        let tracer = RecordingTracer::new();
        let registry = SpanRegistry::new();
        let run_id = RunId::from(Uuid::new_v4());

        assert!(registry.replace(run_id, holder(&tracer, None)).is_none());

        let displaced = registry.replace(run_id, holder(&tracer, None));
        assert!(displaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_miss_returns_none() {
        let registry = SpanRegistry::new();
        assert!(registry.get(&RunId::from(Uuid::new_v4())).is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let tracer = RecordingTracer::new();
        let registry = SpanRegistry::new();
        let run_id = RunId::from(Uuid::new_v4());

        registry.put(run_id, holder(&tracer, None)).unwrap();

        assert!(registry.remove(&run_id).is_some());
        assert!(registry.remove(&run_id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_does_not_affect_siblings() {
        let tracer = RecordingTracer::new();
        let registry = SpanRegistry::new();
        let parent = RunId::from(Uuid::new_v4());
        let child_a = RunId::from(Uuid::new_v4());
        let child_b = RunId::from(Uuid::new_v4());

        registry.put(parent, holder(&tracer, None)).unwrap();
        registry.put(child_a, holder(&tracer, Some(parent))).unwrap();
        registry.put(child_b, holder(&tracer, Some(parent))).unwrap();

        registry.remove(&child_a);

        assert!(registry.get(&parent).is_some());
        assert!(registry.get(&child_b).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_insert_and_remove() {
        let tracer = Arc::new(RecordingTracer::new());
        let registry = Arc::new(SpanRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracer = Arc::clone(&tracer);
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    let run_id = RunId::from(Uuid::new_v4());
                    let span = tracer.start_span("worker", RunKind::Tool, None);
                    registry.put(run_id, Arc::new(SpanHolder::new(span, None))).unwrap();
                    assert!(registry.get(&run_id).is_some());
                    assert!(registry.remove(&run_id).is_some());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(registry.is_empty());
    }
}

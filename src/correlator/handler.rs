//! Event correlator driving span creation and closure
//!
//! This module provides the central engine for turning host lifecycle
//! events into a span tree. It coordinates with the span registry and
//! provides convenience methods for recording the different kinds of runs.
//!
//! Every run id moves through `Unseen -> Open -> Closed`: a start event
//! opens a span (as a child of the parent run's span when that parent is
//! still live), and the matching end or error event closes it and drops
//! the registry entry. Inconsistent sequences degrade to logged no-ops;
//! nothing in here is allowed to disturb the host call path.

use super::registry::{SpanHolder, SpanRegistry};
use crate::callback::{CallbackHandler, HandlerTag};
use crate::error::TracelinkError;
use crate::run::{LifecycleEvent, RunId, RunKind};
use crate::tracer::{SpanStatus, Tracer};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tag under which the correlator registers on a callback manager
pub const CORRELATOR_TAG: HandlerTag = HandlerTag::new("tracelink.span-correlator");

/// Type alias for exception logger callback functions
pub type ExceptionLogger = Arc<dyn Fn(&TracelinkError) + Send + Sync>;

/// Configuration for a [`SpanCorrelator`].
///
/// The exception logger receives faults the correlator contains at its
/// boundary. It is explicit configuration handed to the constructor;
/// there is no ambient global to mutate.
#[derive(Default, Clone)]
pub struct CorrelatorConfig {
    pub exception_logger: Option<ExceptionLogger>,
}

impl CorrelatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route contained faults to the given callback
    pub fn with_exception_logger(mut self, logger: ExceptionLogger) -> Self {
        self.exception_logger = Some(logger);
        self
    }
}

/// Correlates lifecycle events into one span per run.
///
/// The correlator owns the tracer capability and shares the registry with
/// the context propagator. All entry points take `&self` and are safe for
/// concurrent callers; events for unrelated runs may arrive interleaved
/// from any thread.
pub struct SpanCorrelator {
    tracer: Arc<dyn Tracer>,
    registry: Arc<SpanRegistry>,
    config: CorrelatorConfig,
}

impl SpanCorrelator {
    /// Create a correlator with default configuration
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self::with_config(tracer, CorrelatorConfig::default())
    }

    /// Create a correlator with explicit configuration
    pub fn with_config(tracer: Arc<dyn Tracer>, config: CorrelatorConfig) -> Self {
        Self {
            tracer,
            registry: Arc::new(SpanRegistry::new()),
            config,
        }
    }

    /// The registry of live spans, shared with the context propagator
    pub fn registry(&self) -> Arc<SpanRegistry> {
        Arc::clone(&self.registry)
    }

    /// Process one lifecycle event.
    ///
    /// This is a total function: faults inside span creation or closure,
    /// including panics from a foreign tracer backend, are caught here,
    /// routed to the configured exception logger, and never reach the
    /// caller.
    pub fn handle(&self, event: &LifecycleEvent) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.apply(event))) {
            let fault = TracelinkError::InstrumentationFault(panic_message(payload));
            self.report_fault(&fault);
        }
    }

    /// Record the start of a chain run
    pub fn on_chain_start(
        &self,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        name: impl Into<String>,
        inputs: HashMap<String, serde_json::Value>,
    ) {
        self.on_start(RunKind::Chain, run_id, parent_run_id, name, inputs);
    }

    /// Record the start of an LLM call run
    pub fn on_llm_start(
        &self,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        model: impl Into<String>,
        inputs: HashMap<String, serde_json::Value>,
    ) {
        self.on_start(RunKind::Llm, run_id, parent_run_id, model, inputs);
    }

    /// Record the start of a tool run
    pub fn on_tool_start(
        &self,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        tool_name: impl Into<String>,
        inputs: HashMap<String, serde_json::Value>,
    ) {
        self.on_start(RunKind::Tool, run_id, parent_run_id, tool_name, inputs);
    }

    /// Record the start of a retriever run
    pub fn on_retriever_start(
        &self,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        name: impl Into<String>,
        inputs: HashMap<String, serde_json::Value>,
    ) {
        self.on_start(RunKind::Retriever, run_id, parent_run_id, name, inputs);
    }

    /// Record the successful end of a run
    pub fn on_end(&self, run_id: RunId, outputs: HashMap<String, serde_json::Value>) {
        self.handle(&LifecycleEvent::End { run_id, outputs });
    }

    /// Record the failure of a run
    pub fn on_error(&self, run_id: RunId, error: impl Into<String>) {
        self.handle(&LifecycleEvent::Error {
            run_id,
            error: error.into(),
        });
    }

    fn on_start(
        &self,
        kind: RunKind,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        name: impl Into<String>,
        inputs: HashMap<String, serde_json::Value>,
    ) {
        self.handle(&LifecycleEvent::Start {
            kind,
            run_id,
            parent_run_id,
            name: name.into(),
            inputs,
            tags: Vec::new(),
            metadata: HashMap::new(),
        });
    }

    fn apply(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Start {
                kind,
                run_id,
                parent_run_id,
                name,
                inputs,
                tags,
                metadata,
            } => self.open_span(*kind, *run_id, *parent_run_id, name, inputs, tags, metadata),
            LifecycleEvent::End { run_id, outputs } => {
                self.close_span(*run_id, SpanStatus::Ok, outputs, "output");
            }
            LifecycleEvent::Error { run_id, error } => {
                let payload = HashMap::from([(
                    "message".to_string(),
                    serde_json::Value::String(error.clone()),
                )]);
                self.close_span(*run_id, SpanStatus::error(error.clone()), &payload, "error");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn open_span(
        &self,
        kind: RunKind,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        name: &str,
        inputs: &HashMap<String, serde_json::Value>,
        tags: &[String],
        metadata: &HashMap<String, serde_json::Value>,
    ) {
        let parent = match parent_run_id {
            Some(parent_id) => {
                let found = self.registry.get(&parent_id);
                if found.is_none() {
                    // the parent may have been closed already; the child
                    // becomes a trace root rather than getting dropped
                    debug!("parent run {} not live; starting {} as root", parent_id, run_id);
                }
                found
            }
            None => None,
        };

        let span_name = if name.is_empty() { kind.as_str() } else { name };
        let span = self
            .tracer
            .start_span(span_name, kind, parent.as_deref().map(|p| p.context()));

        span.set_attribute("run.kind", serde_json::Value::String(kind.to_string()));
        span.set_attribute("run.id", serde_json::Value::String(run_id.to_string()));
        if let Some(parent_id) = parent_run_id {
            span.set_attribute(
                "run.parent_id",
                serde_json::Value::String(parent_id.to_string()),
            );
        }
        if !tags.is_empty() {
            span.set_attribute("tags", serde_json::json!(tags));
        }
        for (key, value) in metadata {
            span.set_attribute(&format!("metadata.{}", key), value.clone());
        }
        for (key, value) in inputs {
            span.set_attribute(&format!("input.{}", key), value.clone());
        }

        let holder = Arc::new(SpanHolder::new(span, parent_run_id));
        if self.registry.put(run_id, Arc::clone(&holder)).is_err() {
            warn!("duplicate start for run {}; replacing the live span", run_id);
            if let Some(displaced) = self.registry.replace(run_id, holder) {
                displaced
                    .span()
                    .end(SpanStatus::error("displaced by duplicate start"));
            }
        }
    }

    fn close_span(
        &self,
        run_id: RunId,
        status: SpanStatus,
        payload: &HashMap<String, serde_json::Value>,
        payload_prefix: &str,
    ) {
        let holder = match self.registry.remove(&run_id) {
            Some(holder) => holder,
            None => {
                // unseen or already-closed run; never force-create a span here
                debug!("no live span for run {}; ignoring terminal event", run_id);
                return;
            }
        };

        for (key, value) in payload {
            holder
                .span()
                .set_attribute(&format!("{}.{}", payload_prefix, key), value.clone());
        }
        holder.span().end(status);
    }

    pub(crate) fn report_fault(&self, fault: &TracelinkError) {
        warn!("tracing fault contained: {}", fault);
        if let Some(logger) = &self.config.exception_logger {
            logger(fault);
        }
    }
}

impl CallbackHandler for SpanCorrelator {
    fn tag(&self) -> HandlerTag {
        CORRELATOR_TAG
    }

    fn handle_event(&self, event: &LifecycleEvent) {
        self.handle(event);
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "instrumentation panicked".to_string()
    }
}

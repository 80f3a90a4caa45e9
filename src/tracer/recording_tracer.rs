//! In-memory recording backend with thread-safe storage
//!
//! This module provides a tracer backend that fabricates trace contexts and
//! keeps every finished span in memory. It backs the crate's own tests and
//! demos, and doubles as a debugging aid when a host wants to inspect the
//! reconstructed execution tree without an export pipeline.

use super::context::TraceContext;
use super::span::{SpanHandle, SpanStatus, Tracer};
use crate::run::RunKind;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// A completed span as captured by [`RecordingTracer`]
#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub name: String,
    pub kind: RunKind,
    pub context: TraceContext,
    /// Context of the parent span at creation time, if any
    pub parent_context: Option<TraceContext>,
    pub status: SpanStatus,
    pub attributes: HashMap<String, serde_json::Value>,
    /// Unix timestamp when the span started
    pub started_at: f64,
    /// Unix timestamp when the span ended
    pub ended_at: f64,
}

impl FinishedSpan {
    /// Duration of the span in milliseconds
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at) * 1000.0
    }

    /// Get a formatted string summary of the span
    pub fn printable_summary(&self) -> String {
        let dt = DateTime::from_timestamp(self.started_at as i64, 0)
            .unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
            .with_timezone(&Local);
        let time_str = dt.format("%H:%M:%S%.3f").to_string();

        let mut summary = format!(
            "[{}] {} span '{}' (trace: {}, span: {})",
            time_str,
            self.kind,
            self.name,
            self.context.trace_id(),
            self.context.span_id()
        );

        if let Some(parent) = &self.parent_context {
            summary.push_str(&format!("\n   Parent span: {}", parent.span_id()));
        }

        match &self.status {
            SpanStatus::Ok => summary.push_str("\n   Status: ok"),
            SpanStatus::Error { message } => {
                summary.push_str(&format!("\n   Status: error ({})", message));
            }
        }

        summary.push_str(&format!("\n   Duration: {:.2}ms", self.duration_ms()));

        if !self.attributes.is_empty() {
            let mut keys: Vec<&str> = self.attributes.keys().map(|k| k.as_str()).collect();
            keys.sort_unstable();
            summary.push_str(&format!("\n   Attributes: {}", keys.join(", ")));
        }

        summary
    }
}

/// Tracer backend that records finished spans into shared memory
///
/// Contexts are fabricated locally: root spans receive a fresh trace id,
/// child spans inherit the parent's trace id with a fresh span id. Live
/// spans are owned by their handles; only ended spans appear in the store.
pub struct RecordingTracer {
    finished: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl RecordingTracer {
    /// Create a new recording tracer with an empty store
    pub fn new() -> Self {
        Self {
            finished: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of all finished spans, in end order
    pub fn finished_spans(&self) -> Vec<FinishedSpan> {
        self.finished.lock().unwrap().clone()
    }

    /// Finished spans with the given name
    pub fn find_by_name(&self, name: &str) -> Vec<FinishedSpan> {
        self.finished
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// Number of finished spans in the store
    pub fn len(&self) -> usize {
        self.finished.lock().unwrap().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.finished.lock().unwrap().is_empty()
    }

    /// Clear all finished spans from the store
    pub fn clear(&self) {
        self.finished.lock().unwrap().clear();
    }
}

impl Default for RecordingTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for RecordingTracer {
    fn start_span(
        &self,
        name: &str,
        kind: RunKind,
        parent: Option<&TraceContext>,
    ) -> Box<dyn SpanHandle> {
        let context = match parent {
            Some(parent) => TraceContext::child_of(parent),
            None => TraceContext::new_root(),
        };

        Box::new(RecordingSpan {
            name: name.to_string(),
            kind,
            context,
            parent_context: parent.cloned(),
            started_at: current_timestamp(),
            state: Mutex::new(SpanState {
                attributes: HashMap::new(),
                ended: false,
            }),
            sink: Arc::clone(&self.finished),
        })
    }
}

struct SpanState {
    attributes: HashMap<String, serde_json::Value>,
    ended: bool,
}

struct RecordingSpan {
    name: String,
    kind: RunKind,
    context: TraceContext,
    parent_context: Option<TraceContext>,
    started_at: f64,
    state: Mutex<SpanState>,
    sink: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl SpanHandle for RecordingSpan {
    fn context(&self) -> &TraceContext {
        &self.context
    }

    fn set_attribute(&self, key: &str, value: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        if state.ended {
            return;
        }
        state.attributes.insert(key.to_string(), value);
    }

    fn end(&self, status: SpanStatus) {
        let attributes = {
            let mut state = self.state.lock().unwrap();
            if state.ended {
                return;
            }
            state.ended = true;
            std::mem::take(&mut state.attributes)
        };

        let finished = FinishedSpan {
            name: self.name.clone(),
            kind: self.kind,
            context: self.context.clone(),
            parent_context: self.parent_context.clone(),
            status,
            attributes,
            started_at: self.started_at,
            ended_at: current_timestamp(),
        };

        self.sink.lock().unwrap().push(finished);
    }
}

/// Get current timestamp as Unix timestamp (seconds since epoch)
fn current_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64()
}

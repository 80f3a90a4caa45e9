//! Run identifiers and lifecycle events.
//!
//! The host orchestration runtime drives execution as a tree of runs: chains
//! invoke LLM calls, tools, and retrievers, each identified by a [`RunId`] the
//! host assigns. This module defines the run vocabulary and the lifecycle
//! events the host's callback machinery delivers for each run.
//!
//! # Examples
//!
//! ```
//! use tracelink::run::{LifecycleEvent, RunId, RunKind};
//! use uuid::Uuid;
//!
//! let chain = RunId::from(Uuid::new_v4());
//! let llm = RunId::from(Uuid::new_v4());
//!
//! let start = LifecycleEvent::start(RunKind::Llm, llm, Some(chain), "completion");
//! assert_eq!(start.run_id(), llm);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier the host runtime assigns to one execution of a chain,
/// LLM call, tool, or retriever.
///
/// Tracelink never generates run ids; it only compares and stores the ones
/// the host hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// View the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The kind of operation a run represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Chain,
    Llm,
    Tool,
    Retriever,
}

impl RunKind {
    /// Lowercase name used in span names and attributes
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Chain => "chain",
            RunKind::Llm => "llm",
            RunKind::Tool => "tool",
            RunKind::Retriever => "retriever",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle notification from the host's callback machinery.
///
/// Start carries the structural fields the correlation engine needs (`run_id`,
/// `parent_run_id`) plus kind-specific payload used only to populate span
/// names and attributes. End and error carry the terminal payload for the run.
///
/// For a single run id the host delivers start before end/error; events for
/// unrelated runs may interleave from any thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Start {
        kind: RunKind,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        /// Operation name, e.g. a chain class name, model name, or tool name.
        /// Empty means unnamed; the span falls back to the kind.
        name: String,
        #[serde(default)]
        inputs: HashMap<String, serde_json::Value>,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        metadata: HashMap<String, serde_json::Value>,
    },
    End {
        run_id: RunId,
        #[serde(default)]
        outputs: HashMap<String, serde_json::Value>,
    },
    Error {
        run_id: RunId,
        error: String,
    },
}

impl LifecycleEvent {
    /// Create a start event with an empty payload
    pub fn start(
        kind: RunKind,
        run_id: RunId,
        parent_run_id: Option<RunId>,
        name: impl Into<String>,
    ) -> Self {
        LifecycleEvent::Start {
            kind,
            run_id,
            parent_run_id,
            name: name.into(),
            inputs: HashMap::new(),
            tags: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Create an end event with an empty payload
    pub fn end(run_id: RunId) -> Self {
        LifecycleEvent::End {
            run_id,
            outputs: HashMap::new(),
        }
    }

    /// Create an error event
    pub fn error(run_id: RunId, error: impl Into<String>) -> Self {
        LifecycleEvent::Error {
            run_id,
            error: error.into(),
        }
    }

    /// The run this event belongs to
    pub fn run_id(&self) -> RunId {
        match self {
            LifecycleEvent::Start { run_id, .. }
            | LifecycleEvent::End { run_id, .. }
            | LifecycleEvent::Error { run_id, .. } => *run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_display_matches_uuid() {
        let uuid = Uuid::new_v4();
        let run_id = RunId::from(uuid);

        assert_eq!(run_id.to_string(), uuid.to_string());
        assert_eq!(run_id.as_uuid(), &uuid);
    }

    #[test]
    fn test_run_id_equality() {
        let uuid = Uuid::new_v4();
        assert_eq!(RunId::from(uuid), RunId::from(uuid));
        assert_ne!(RunId::from(uuid), RunId::from(Uuid::new_v4()));
    }

    #[test]
    fn test_run_kind_names() {
        assert_eq!(RunKind::Chain.to_string(), "chain");
        assert_eq!(RunKind::Llm.to_string(), "llm");
        assert_eq!(RunKind::Tool.to_string(), "tool");
        assert_eq!(RunKind::Retriever.to_string(), "retriever");
    }

    #[test]
    fn test_start_event_accessors() {
        let run_id = RunId::from(Uuid::new_v4());
        let parent = RunId::from(Uuid::new_v4());

        let event = LifecycleEvent::start(RunKind::Tool, run_id, Some(parent), "web_search");
        assert_eq!(event.run_id(), run_id);

        match event {
            LifecycleEvent::Start {
                kind,
                parent_run_id,
                name,
                inputs,
                ..
            } => {
                assert_eq!(kind, RunKind::Tool);
                assert_eq!(parent_run_id, Some(parent));
                assert_eq!(name, "web_search");
                assert!(inputs.is_empty());
            }
            _ => panic!("Expected Start"),
        }
    }

    #[test]
    fn test_end_and_error_events() {
        let run_id = RunId::from(Uuid::new_v4());

        let end = LifecycleEvent::end(run_id);
        assert_eq!(end.run_id(), run_id);

        let error = LifecycleEvent::error(run_id, "rate limit exceeded");
        assert_eq!(error.run_id(), run_id);
        match error {
            LifecycleEvent::Error { error, .. } => {
                assert_eq!(error, "rate limit exceeded");
            }
            _ => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let run_id = RunId::from(Uuid::new_v4());
        let mut event = LifecycleEvent::start(RunKind::Llm, run_id, None, "qwen2.5:7b");

        if let LifecycleEvent::Start { inputs, .. } = &mut event {
            inputs.insert("prompt".to_string(), serde_json::json!("hello"));
        }

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"phase\":\"start\""));

        let parsed: LifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id(), run_id);
    }
}

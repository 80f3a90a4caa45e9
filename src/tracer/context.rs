//! Trace context and the W3C trace-context text codec
//!
//! A [`TraceContext`] carries the identifying state of one span: a 128-bit
//! trace id, a 64-bit span id, and a flags byte, all held as lowercase hex
//! strings. The text form follows the W3C `traceparent` header,
//! `00-<trace-id>-<span-id>-<flags>`, so a downstream service continues the
//! same trace when the header is injected into an outbound request.

use crate::error::{Result, TracelinkError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Header key used when injecting a context into a carrier mapping
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Only version 00 of the traceparent format is produced or accepted.
const SUPPORTED_VERSION: &str = "00";

const TRACE_ID_LEN: usize = 32;
const SPAN_ID_LEN: usize = 16;

/// Identifying state of one span, carried across process boundaries.
///
/// The context is derived from a span at creation time and never mutated
/// afterwards; child spans receive a fresh span id under the same trace id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    trace_id: String,
    span_id: String,
    flags: u8,
}

impl TraceContext {
    /// Create a context for a new trace root with the sampled flag set
    pub fn new_root() -> Self {
        Self {
            trace_id: generate_trace_id(),
            span_id: generate_span_id(),
            flags: 0x01,
        }
    }

    /// Create a context for a child span: same trace id, fresh span id,
    /// inherited flags
    pub fn child_of(parent: &TraceContext) -> Self {
        Self {
            trace_id: parent.trace_id.clone(),
            span_id: generate_span_id(),
            flags: parent.flags,
        }
    }

    /// A context that identifies nothing; used by disabled backends.
    /// Invalid contexts are never injected into carriers.
    pub fn invalid() -> Self {
        Self {
            trace_id: "0".repeat(TRACE_ID_LEN),
            span_id: "0".repeat(SPAN_ID_LEN),
            flags: 0,
        }
    }

    /// The 32-hex-digit trace id
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The 16-hex-digit span id
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// The trace flags byte (bit 0 is the sampled flag)
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// True when both ids are non-zero, per the W3C validity rules
    pub fn is_valid(&self) -> bool {
        self.trace_id.bytes().any(|b| b != b'0') && self.span_id.bytes().any(|b| b != b'0')
    }

    /// Serialize to the `traceparent` header value
    pub fn to_traceparent(&self) -> String {
        format!(
            "{}-{}-{}-{:02x}",
            SUPPORTED_VERSION, self.trace_id, self.span_id, self.flags
        )
    }

    /// Parse a `traceparent` header value
    pub fn from_traceparent(header: &str) -> Result<Self> {
        let parts: Vec<&str> = header.split('-').collect();
        if parts.len() != 4 {
            return Err(TracelinkError::InvalidTraceContext(format!(
                "expected 4 fields, got {}",
                parts.len()
            )));
        }

        let (version, trace_id, span_id, flags) = (parts[0], parts[1], parts[2], parts[3]);

        if version != SUPPORTED_VERSION {
            return Err(TracelinkError::InvalidTraceContext(format!(
                "unsupported version: {}",
                version
            )));
        }
        if trace_id.len() != TRACE_ID_LEN || !is_lower_hex(trace_id) {
            return Err(TracelinkError::InvalidTraceContext(format!(
                "bad trace id: {}",
                trace_id
            )));
        }
        if span_id.len() != SPAN_ID_LEN || !is_lower_hex(span_id) {
            return Err(TracelinkError::InvalidTraceContext(format!(
                "bad span id: {}",
                span_id
            )));
        }
        let flags = u8::from_str_radix(flags, 16).map_err(|_| {
            TracelinkError::InvalidTraceContext(format!("bad flags: {}", flags))
        })?;

        let context = Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            flags,
        };

        if !context.is_valid() {
            return Err(TracelinkError::InvalidTraceContext(
                "all-zero trace or span id".to_string(),
            ));
        }

        Ok(context)
    }

    /// Merge this context into a header mapping.
    ///
    /// The `traceparent` key is overwritten if present; all other keys are
    /// left untouched.
    pub fn inject(&self, headers: &mut HashMap<String, String>) {
        headers.insert(TRACEPARENT_HEADER.to_string(), self.to_traceparent());
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// 32 hex digits from a v4 UUID
fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 16 hex digits, the top half of a v4 UUID
fn generate_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SPAN_ID_LEN);
    id
}

// agent-kernel-core/src/core/event.rs
// ============================================================================
// Module: Agent Kernel Episodic Events
// Description: The append-only record kind underlying the Episodic Trace.
// Purpose: Define Event, the primary audit record per spec.md §3.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every gate attempt, accepted or denied memory write, tool invocation,
//! and firewall rejection is recorded as an `Event`. The payload is an
//! opaque map by design (spec.md §9: dict-typed payloads are acceptable
//! only at this outermost boundary); the event's `event_type` string is
//! the caller-defined taxonomy, not a closed enum, so new record kinds
//! (e.g. `decision_recorded`, carried over from the original decision
//! journal) need no core-crate change to introduce.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EventId;
use crate::core::identifiers::ProblemId;
use crate::core::identifiers::SessionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event
// ============================================================================

/// A single immutable entry in the Episodic Trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Caller-defined event taxonomy (e.g. `"gate_attempt"`,
    /// `"write_completed"`, `"write_denied"`, `"decision_recorded"`).
    pub event_type: String,
    /// Timestamp of the event.
    pub timestamp: Timestamp,
    /// Opaque structured payload.
    pub payload: BTreeMap<String, Value>,
    /// Other events this one references (e.g. the request it completes).
    pub refs: Vec<EventId>,
    /// Problem this event is scoped to, if any.
    pub problem_id: Option<ProblemId>,
    /// Session this event occurred in. Auto-assigned by the trace if unset
    /// at append time, per spec.md §4.12.
    pub session_id: Option<SessionId>,
}

impl Event {
    /// Returns true when `event_type` matches `candidate`.
    #[must_use]
    pub fn is_type(&self, candidate: &str) -> bool {
        self.event_type == candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_type_matches_exact_event_type() {
        let event = Event {
            id: EventId::new("e1"),
            event_type: "gate_attempt".to_string(),
            timestamp: Timestamp::Logical(1),
            payload: BTreeMap::new(),
            refs: vec![],
            problem_id: None,
            session_id: None,
        };
        assert!(event.is_type("gate_attempt"));
        assert!(!event.is_type("write_completed"));
    }
}

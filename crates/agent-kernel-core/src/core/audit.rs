// agent-kernel-core/src/core/audit.rs
// ============================================================================
// Module: Agent Kernel Audit Events
// Description: The durable record of every policy decision and tool
// execution.
// Purpose: Define AuditEvent and AuditDecision.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! An audit event is emitted by the Policy Decision Point and Tool Runtime
//! for every decision, allowed or denied. `emotional_signals` is metadata
//! only: the Policy Decision Point's decision function has no field access
//! to it, so it cannot influence `decision` by construction (spec.md §9
//! Open Questions).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::AuditId;
use crate::core::identifiers::LaneId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::ToolId;
use crate::core::identifiers::TurnId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Audit Decision
// ============================================================================

/// The outcome an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDecision {
    /// The decision permitted the action.
    Allow,
    /// The decision rejected the action.
    Deny,
}

// ============================================================================
// SECTION: Audit Event
// ============================================================================

/// A durable record of a single policy decision or tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique audit record identifier.
    pub id: AuditId,
    /// Timestamp of the decision.
    pub timestamp: Timestamp,
    /// Whether the action was allowed or denied.
    pub decision: AuditDecision,
    /// Tool the decision concerned.
    pub tool_id: ToolId,
    /// Request identifier, used to correlate an approval with its
    /// original denial.
    pub request_id: RequestId,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Lane the request originated from.
    pub lane_id: Option<LaneId>,
    /// Agent the request originated from.
    pub agent_id: Option<AgentId>,
    /// Turn the decision was made on.
    pub turn_id: TurnId,
    /// Obligations fulfilled as part of this decision (e.g. `"audit"`,
    /// `"approval_required"`).
    pub obligations: Vec<String>,
    /// Emotional-signal metadata, propagated for observability only. Never
    /// read by any authorization decision.
    pub emotional_signals: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test-only assertions")]

    use super::*;

    #[test]
    fn audit_event_is_serializable_round_trip() {
        let event = AuditEvent {
            id: AuditId::new("a1"),
            timestamp: Timestamp::Logical(1),
            decision: AuditDecision::Deny,
            tool_id: ToolId::new("fs.write_file"),
            request_id: RequestId::new("r1"),
            reason: "approval required".to_string(),
            lane_id: None,
            agent_id: None,
            turn_id: 3,
            obligations: vec!["approval_required".to_string()],
            emotional_signals: BTreeMap::new(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let round_tripped: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped.id, event.id);
        assert_eq!(round_tripped.decision, AuditDecision::Deny);
    }
}

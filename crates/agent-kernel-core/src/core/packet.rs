// agent-kernel-core/src/core/packet.rs
// ============================================================================
// Module: Agent Kernel Packets
// Description: The structured envelope agents use to communicate upward.
// Purpose: Define AgentPacket, the per-turn output agents produce.
// Dependencies: crate::core::{identifiers, proposal}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every agent response crosses the Packet Firewall as an `AgentPacket`
//! before any of its content can influence proposals, memory, or authority.
//! Agents never produce decisions; they only produce advisory proposals
//! carried in a packet. The packet format itself carries no trust; the
//! firewall in the runtime crate decides what is admissible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::proposal::Proposal;

// ============================================================================
// SECTION: Agent Packet
// ============================================================================

/// An agent's per-turn output.
///
/// # Invariants
/// - Agents never produce decisions: a packet whose `message` contains a
///   configured side-effect claim, or whose `proposals` request a
///   protected gate, fails the firewall and is discarded for the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPacket {
    /// Free-form natural-language message for the user or orchestrator.
    pub message: String,
    /// Advisory proposals produced this turn, in emission order.
    pub proposals: Vec<Proposal>,
    /// Agent's self-reported confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Opaque trace metadata. Must include `agent_id`; also conventionally
    /// carries `version`, `turn`, and `lane_id`. Schema-less at this
    /// boundary by design (see spec.md §9 on dict-typed payloads).
    pub traces: BTreeMap<String, Value>,
}

impl AgentPacket {
    /// Returns the `agent_id` trace field, if present and string-typed.
    #[must_use]
    pub fn agent_id_trace(&self) -> Option<&str> {
        self.traces.get("agent_id").and_then(Value::as_str)
    }

    /// Returns true when the required `agent_id` trace field is present.
    ///
    /// Its absence is a warning-only firewall finding (spec.md §4.5 rule 7),
    /// not a hard rejection.
    #[must_use]
    pub fn has_required_traces(&self) -> bool {
        self.traces.contains_key("agent_id")
    }
}

// agent-kernel-core/src/core/gate.rs
// ============================================================================
// Module: Agent Kernel Gate Types
// Description: Gate kinds, severities, and gate-attempt records.
// Purpose: Define the typed checkpoints through which authority may change.
// Dependencies: crate::core::{stance, time, identifiers}, serde
// ============================================================================

//! ## Overview
//! A gate is the only legitimate mutator of authoritative state. This module
//! defines the closed set of gate kinds and the record produced by every
//! attempt (successful or denied); the Gate Controller in the runtime crate
//! owns the actual transition logic and predicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::GateRequestName;
use crate::core::identifiers::TurnId;
use crate::core::stance::Stance;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Gate Kind
// ============================================================================

/// The closed set of gate checkpoints recognized by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Moves between Sensemaking and Discovery.
    Framing,
    /// Establishes a commitment lease and moves to Execution.
    Commitment,
    /// Moves into or out of Evaluation.
    Evaluation,
    /// Forces Sensemaking regardless of current stance, subject to cooldown.
    Emergency,
    /// Approves a pending write-side-effect tool invocation.
    WriteApproval,
    /// Pauses the active lane and activates another.
    LaneSwitch,
    /// Declares a new unit of work inside a lane.
    WorkDeclaration,
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Framing => "framing",
            Self::Commitment => "commitment",
            Self::Evaluation => "evaluation",
            Self::Emergency => "emergency",
            Self::WriteApproval => "write_approval",
            Self::LaneSwitch => "lane_switch",
            Self::WorkDeclaration => "work_declaration",
        };
        f.write_str(label)
    }
}

/// Default protected gate-request names that advisory agents may never
/// request directly, per spec.md §4.5 rule 2.
#[must_use]
pub fn default_protected_gate_requests() -> Vec<GateRequestName> {
    vec![
        GateRequestName::new("stance_override"),
        GateRequestName::new("commitment_force"),
        GateRequestName::new("authority_grant"),
    ]
}

// ============================================================================
// SECTION: Gate Result
// ============================================================================

/// Outcome of a single gate attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate kind attempted.
    pub gate: GateKind,
    /// Whether the attempt succeeded.
    pub approved: bool,
    /// Stance before the attempt.
    pub from_stance: Stance,
    /// Stance after the attempt (equal to `from_stance` when denied).
    pub to_stance: Stance,
    /// Human-readable reason supplied by the caller.
    pub reason: String,
    /// Error detail when denied.
    pub error: Option<String>,
    /// Turn on which the attempt occurred.
    pub turn: TurnId,
    /// Timestamp of the attempt.
    pub at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_kind_display_matches_snake_case_serde_tag() {
        assert_eq!(GateKind::WriteApproval.to_string(), "write_approval");
        assert_eq!(GateKind::LaneSwitch.to_string(), "lane_switch");
    }
}

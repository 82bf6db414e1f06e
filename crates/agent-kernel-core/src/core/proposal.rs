// agent-kernel-core/src/core/proposal.rs
// ============================================================================
// Module: Agent Kernel Proposals
// Description: Advisory records buffered per turn and arbitrated by the gate
// controller.
// Purpose: Define the closed set of proposal kinds, sources, and severities.
// Dependencies: crate::core::{gate, identifiers}, serde_json, serde
// ============================================================================

//! ## Overview
//! A proposal is advisory: producing one never mutates authoritative state.
//! Proposals are immutable once buffered; only the runtime's Proposal Buffer
//! and Gate Controller decide what happens to them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::GateRequestName;
use crate::core::identifiers::ProposalId;
use crate::core::identifiers::ToolId;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity attached to gate requests and contrast reports.
///
/// Ordered so duplicate gate requests from the same source can collapse to
/// the highest severity via `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no urgency.
    Low,
    /// Worth attention this turn.
    Medium,
    /// Should be processed ahead of lower-severity proposals.
    High,
    /// Processed before anything else, exactly once per turn.
    Emergency,
}

// ============================================================================
// SECTION: Proposal Source
// ============================================================================

/// Source tag used for priority ordering within the Gate Controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalSource {
    /// Direct user signal (highest default priority).
    UserSignal,
    /// Emitted when a commitment lease's turn budget reaches zero.
    CommitmentExpiry,
    /// Emitted by the perception sensor.
    Perception,
    /// Emitted by the continuous evaluator.
    ContinuousEval,
    /// Emitted by the contrast detector.
    Contrast,
    /// Emitted by an advisory agent (via the packet firewall).
    Agent,
}

// ============================================================================
// SECTION: Lane Action Kind
// ============================================================================

/// Kinds of lane-directed proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneActionKind {
    /// Requests creation of a new lane.
    Create,
    /// Requests pausing the active lane.
    Pause,
    /// Requests resuming a paused lane.
    Resume,
    /// Requests marking a lane complete.
    Complete,
    /// Requests renewing a lane's lease.
    RenewLease,
}

// ============================================================================
// SECTION: Proposal Kind
// ============================================================================

/// The closed set of proposal kinds the kernel recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalKind {
    /// Requests a gate transition.
    GateRequest {
        /// Gate name as requested, checked against the firewall's
        /// protected-gate-request set before it ever reaches the Gate
        /// Controller.
        gate: GateRequestName,
        /// Human-readable justification.
        reason: String,
        /// Urgency of the request.
        severity: Severity,
    },
    /// Requests execution of a declared tool.
    ToolRequest {
        /// Tool identifier.
        tool_id: ToolId,
        /// Tool arguments (schema validated by the Tool Runtime).
        args: Value,
    },
    /// Requests a lane state change.
    LaneAction {
        /// Lane action requested.
        action: LaneActionKind,
        /// Action-specific payload.
        payload: Value,
    },
    /// Reports a gap between expected and observed state.
    ContrastReport {
        /// Severity of the observed gap.
        gap_severity: Severity,
        /// Human-readable description of the gap.
        description: String,
    },
    /// Carries a raw perception signal for downstream interpretation.
    PerceptionSignal {
        /// Signal kind tag.
        signal_kind: String,
        /// Signal payload.
        payload: Value,
    },
}

impl ProposalKind {
    /// Returns the gate name when this is a [`ProposalKind::GateRequest`].
    #[must_use]
    pub const fn as_gate_request(&self) -> Option<(&GateRequestName, Severity)> {
        match self {
            Self::GateRequest {
                gate,
                severity,
                ..
            } => Some((gate, *severity)),
            _ => None,
        }
    }

    /// Returns the tool id when this is a [`ProposalKind::ToolRequest`].
    #[must_use]
    pub const fn as_tool_request(&self) -> Option<&ToolId> {
        match self {
            Self::ToolRequest {
                tool_id,
                ..
            } => Some(tool_id),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Proposal
// ============================================================================

/// An immutable advisory record buffered for a single turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier, unique within the turn's buffer.
    pub id: ProposalId,
    /// Proposal content.
    pub kind: ProposalKind,
    /// Source that produced this proposal.
    pub source: ProposalSource,
}

impl Proposal {
    /// Creates a new proposal.
    #[must_use]
    pub const fn new(id: ProposalId, kind: ProposalKind, source: ProposalSource) -> Self {
        Self {
            id,
            kind,
            source,
        }
    }

    /// Returns true when this proposal is a gate request with emergency
    /// severity.
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        matches!(self.kind.as_gate_request(), Some((_, Severity::Emergency)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_places_emergency_highest() {
        let mut severities = vec![Severity::Low, Severity::Emergency, Severity::Medium, Severity::High];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Low, Severity::Medium, Severity::High, Severity::Emergency]
        );
    }

    #[test]
    fn is_emergency_detects_emergency_gate_requests() {
        let proposal = Proposal::new(
            ProposalId::new("p1"),
            ProposalKind::GateRequest {
                gate: GateRequestName::new("emergency"),
                reason: "user stop".to_string(),
                severity: Severity::Emergency,
            },
            ProposalSource::UserSignal,
        );
        assert!(proposal.is_emergency());
    }
}

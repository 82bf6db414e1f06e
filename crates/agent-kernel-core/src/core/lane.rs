// agent-kernel-core/src/core/lane.rs
// ============================================================================
// Module: Agent Kernel Lanes
// Description: Independently trackable workstreams within a session.
// Purpose: Define Lane and its lease/budget/snapshot substructures; the
// single-active invariant is enforced by the runtime's Lane Store, not by
// this type.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A lane tracks one strand of work so the kernel can pause and resume it
//! without losing context. At most one lane is `Active` at a time; that
//! invariant, along with the paused-lane cap, is owned by the Lane Store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::LaneId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Lane Status
// ============================================================================

/// Lifecycle state of a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneStatus {
    /// Currently receiving turns; at most one lane holds this status.
    Active,
    /// Suspended with a bookmark describing where to resume.
    Paused,
    /// Finished; no further transitions permitted.
    Completed,
}

// ============================================================================
// SECTION: Lease Mode
// ============================================================================

/// What a lane's lease authorizes while the lane is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseMode {
    /// Authorizes executing against the lane's goal.
    Execution,
    /// Authorizes evaluating progress against the lane's goal.
    Evaluation,
}

// ============================================================================
// SECTION: Lane Lease
// ============================================================================

/// Time-bounded authorization for a lane to remain active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneLease {
    /// What the lease authorizes.
    pub mode: LeaseMode,
    /// Goal statement for this lane's work.
    pub goal: String,
    /// When the lease expires. An expired lease does not auto-expire the
    /// lane; it is surfaced by `check_expired_leases` instead (spec.md
    /// §4.9).
    pub expires_at: Timestamp,
}

// ============================================================================
// SECTION: Lane Budgets
// ============================================================================

/// Per-turn resource limits scoped to a lane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LaneBudgets {
    /// Maximum tool requests the lane may make in a single turn.
    pub max_tool_requests_per_turn: u32,
}

// ============================================================================
// SECTION: Lane Snapshot
// ============================================================================

/// Resumable state captured when a lane is paused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaneSnapshot {
    /// Free-text description of where work left off. Required (non-empty)
    /// to pause a lane, per spec.md §4.9.
    pub bookmark: String,
    /// Ordered list of next steps, restored as obligations on resume.
    pub next_steps: Vec<String>,
    /// Open questions carried into the next active period.
    pub open_questions: Vec<String>,
}

// ============================================================================
// SECTION: Lane
// ============================================================================

/// An independently trackable workstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lane {
    /// Unique lane identifier.
    pub lane_id: LaneId,
    /// Workstream category (e.g. `"writing"`, `"research"`, `"finance"`,
    /// `"ops"`).
    pub kind: String,
    /// Current lifecycle status.
    pub status: LaneStatus,
    /// Active lease.
    pub lease: LaneLease,
    /// Arbitrary policy payload scoped to this lane.
    pub policy: Value,
    /// Per-turn budgets.
    pub budgets: LaneBudgets,
    /// Resumable snapshot, populated when paused.
    pub snapshot: LaneSnapshot,
}

impl Lane {
    /// Returns true when the lane can still receive turns.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, LaneStatus::Active)
    }

    /// Returns true when `lease.expires_at` is at or before `now`, per
    /// spec.md §4.9's ordering on [`Timestamp`].
    #[must_use]
    pub fn lease_expired(&self, now: Timestamp) -> bool {
        self.lease.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lane() -> Lane {
        Lane {
            lane_id: LaneId::new("l1"),
            kind: "research".to_string(),
            status: LaneStatus::Active,
            lease: LaneLease {
                mode: LeaseMode::Execution,
                goal: "investigate the bug".to_string(),
                expires_at: Timestamp::Logical(10),
            },
            policy: Value::Null,
            budgets: LaneBudgets {
                max_tool_requests_per_turn: 5,
            },
            snapshot: LaneSnapshot::default(),
        }
    }

    #[test]
    fn new_lane_starts_active_without_bookmark() {
        let lane = sample_lane();
        assert!(lane.is_active());
        assert!(lane.snapshot.bookmark.is_empty());
    }

    #[test]
    fn lease_expired_compares_against_now() {
        let lane = sample_lane();
        assert!(!lane.lease_expired(Timestamp::Logical(5)));
        assert!(lane.lease_expired(Timestamp::Logical(10)));
        assert!(lane.lease_expired(Timestamp::Logical(11)));
    }
}

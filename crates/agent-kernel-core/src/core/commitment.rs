// agent-kernel-core/src/core/commitment.rs
// ============================================================================
// Module: Agent Kernel Commitment Lease
// Description: The at-most-one active commitment lease.
// Purpose: Define the leased-focus record created only by the Commitment gate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A commitment lease is a focus with success criteria and non-goals,
//! bounded by a turn budget. Non-goals are advisory constraints surfaced to
//! an executor, never enforced by the kernel itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Horizon
// ============================================================================

/// Planning horizon for a commitment lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    /// Resolves within a handful of turns.
    Near,
    /// Resolves over a session.
    Mid,
    /// Spans multiple sessions.
    Far,
}

// ============================================================================
// SECTION: Commitment Lease
// ============================================================================

/// An active leased focus.
///
/// # Invariants
/// - `turns_remaining` decrements exactly once per turn while active.
/// - Created only by the Commitment gate; cleared only by Evaluation or
///   Emergency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentLease {
    /// Short description of what this commitment is about.
    pub frame: String,
    /// Planning horizon.
    pub horizon: Horizon,
    /// Ordered success criteria.
    pub success_criteria: Vec<String>,
    /// Ordered non-goals (advisory only).
    pub non_goals: Vec<String>,
    /// Turns remaining before expiry.
    pub turns_remaining: u32,
    /// Prompt shown when the renewal decision is due.
    pub renewal_prompt: String,
}

impl CommitmentLease {
    /// Creates a new commitment lease with the given turn budget.
    #[must_use]
    pub fn new(
        frame: impl Into<String>,
        horizon: Horizon,
        success_criteria: Vec<String>,
        non_goals: Vec<String>,
        turns: u32,
        renewal_prompt: impl Into<String>,
    ) -> Self {
        Self {
            frame: frame.into(),
            horizon,
            success_criteria,
            non_goals,
            turns_remaining: turns,
            renewal_prompt: renewal_prompt.into(),
        }
    }

    /// Returns true when the lease has no turns remaining.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.turns_remaining == 0
    }

    /// Decrements the turn counter by one, saturating at zero.
    ///
    /// Returns true while the lease is still active after the tick.
    pub fn tick(&mut self) -> bool {
        self.turns_remaining = self.turns_remaining.saturating_sub(1);
        self.turns_remaining > 0
    }

    /// Renews the lease with a fresh turn budget.
    pub fn renew(&mut self, turns: u32) {
        self.turns_remaining = turns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_decrements_exactly_one_per_call() {
        let mut lease =
            CommitmentLease::new("ship the thing", Horizon::Mid, vec![], vec![], 2, "continue?");
        assert!(lease.tick());
        assert_eq!(lease.turns_remaining, 1);
        assert!(!lease.tick());
        assert_eq!(lease.turns_remaining, 0);
        assert!(lease.is_expired());
    }

    #[test]
    fn tick_saturates_and_does_not_underflow() {
        let mut lease = CommitmentLease::new("x", Horizon::Near, vec![], vec![], 0, "continue?");
        assert!(!lease.tick());
        assert_eq!(lease.turns_remaining, 0);
    }
}

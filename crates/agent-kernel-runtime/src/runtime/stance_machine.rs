// agent-kernel-runtime/src/runtime/stance_machine.rs
// ============================================================================
// Module: Stance Machine
// Description: Sole owner of the kernel's current authority mode.
// Purpose: Enforce the gated stance transition table from spec.md §4.1.
// Dependencies: agent_kernel_core::{Stance, GateKind}
// ============================================================================

//! ## Overview
//! Exactly one stance is current at any time. No component other than this
//! machine may mutate it, and it only does so through
//! [`StanceMachine::transition`], called by the Gate Controller on a
//! successful gate evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_kernel_core::GateKind;
use agent_kernel_core::Stance;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Stance Machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StanceError {
    /// The requested gate does not permit moving from the current stance to
    /// the requested target.
    #[error("gate {gate} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Gate that was attempted.
        gate: GateKind,
        /// Stance the transition started from.
        from: Stance,
        /// Stance that was requested.
        to: Stance,
    },
}

// ============================================================================
// SECTION: Stance Machine
// ============================================================================

/// The sole owner of the kernel's current stance.
#[derive(Debug, Clone)]
pub struct StanceMachine {
    /// The kernel's current stance.
    current: Stance,
}

impl Default for StanceMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StanceMachine {
    /// Creates a new stance machine, initialized to `Sensemaking`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Stance::Sensemaking,
        }
    }

    /// Returns the current stance.
    #[must_use]
    pub const fn current(&self) -> Stance {
        self.current
    }

    /// Returns the targets permitted from `from` through `gate`, per the
    /// transition table in spec.md §4.1.
    #[must_use]
    pub fn permitted_targets(from: Stance, gate: GateKind) -> &'static [Stance] {
        use Stance::{Discovery, Evaluation, Execution, Sensemaking};
        match (from, gate) {
            (_, GateKind::Framing) => &[Sensemaking, Discovery],
            (_, GateKind::Commitment) => &[Execution],
            (_, GateKind::Emergency) => &[Sensemaking],
            (Evaluation, GateKind::Evaluation) => &[Sensemaking, Execution],
            (_, GateKind::Evaluation) => &[Evaluation],
            (_, GateKind::WriteApproval | GateKind::LaneSwitch | GateKind::WorkDeclaration) => &[],
        }
    }

    /// Attempts a transition to `target` via `gate`.
    ///
    /// # Errors
    ///
    /// Returns [`StanceError::InvalidTransition`] when `target` is not
    /// permitted from the current stance through `gate`.
    pub fn transition(&mut self, target: Stance, gate: GateKind) -> Result<Stance, StanceError> {
        let from = self.current;
        if Self::permitted_targets(from, gate).contains(&target) {
            self.current = target;
            Ok(from)
        } else {
            Err(StanceError::InvalidTransition {
                gate,
                from,
                to: target,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use super::*;

    #[test]
    fn starts_at_sensemaking() {
        let machine = StanceMachine::new();
        assert_eq!(machine.current(), Stance::Sensemaking);
    }

    #[test]
    fn commitment_gate_moves_any_stance_to_execution() {
        let mut machine = StanceMachine::new();
        let previous = machine.transition(Stance::Execution, GateKind::Commitment).unwrap_or(Stance::Sensemaking);
        assert_eq!(previous, Stance::Sensemaking);
        assert_eq!(machine.current(), Stance::Execution);
    }

    #[test]
    fn evaluation_gate_from_evaluation_may_return_to_execution() {
        let mut machine = StanceMachine::new();
        machine.transition(Stance::Execution, GateKind::Commitment).expect("to execution");
        machine.transition(Stance::Evaluation, GateKind::Evaluation).expect("to evaluation");
        let result = machine.transition(Stance::Execution, GateKind::Evaluation);
        assert_eq!(result, Ok(Stance::Evaluation));
    }

    #[test]
    fn write_approval_gate_never_moves_stance() {
        let mut machine = StanceMachine::new();
        let result = machine.transition(Stance::Execution, GateKind::WriteApproval);
        assert!(result.is_err());
    }

    #[test]
    fn emergency_gate_always_returns_to_sensemaking() {
        let mut machine = StanceMachine::new();
        machine.transition(Stance::Execution, GateKind::Commitment).expect("to execution");
        machine.transition(Stance::Sensemaking, GateKind::Emergency).expect("emergency");
        assert_eq!(machine.current(), Stance::Sensemaking);
    }
}

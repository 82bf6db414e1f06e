// agent-kernel-runtime/src/runtime/gate_controller.rs
// ============================================================================
// Module: Gate Controller
// Description: The arbiter of authority over stance and commitment.
// Purpose: Implement attempt_gate/attempt_emergency/process_proposals per
// spec.md §4.3.
// Dependencies: crate::runtime::{stance_machine, commitment_manager,
// proposal_buffer}, agent_kernel_core
// ============================================================================

//! ## Overview
//! The Gate Controller is the only component that drives the Stance Machine
//! and the Commitment Manager. Every attempt, successful or denied, produces
//! a [`GateResult`] the turn driver persists to History and the Episodic
//! Trace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_kernel_core::CommitmentLease;
use agent_kernel_core::GateKind;
use agent_kernel_core::GateResult;
use agent_kernel_core::Horizon;
use agent_kernel_core::Proposal;
use agent_kernel_core::ProposalId;
use agent_kernel_core::ProposalSource;
use agent_kernel_core::Stance;
use agent_kernel_core::Timestamp;
use agent_kernel_core::TurnId;
use serde::Deserialize;
use serde::Serialize;

use crate::runtime::commitment_manager::CommitmentManager;
use crate::runtime::proposal_buffer::ProposalBuffer;
use crate::runtime::stance_machine::StanceMachine;

/// Default priority order used when no configured order is supplied, per
/// spec.md §4.3 rule 2.
#[must_use]
pub fn default_priority_order() -> Vec<ProposalSource> {
    vec![
        ProposalSource::UserSignal,
        ProposalSource::CommitmentExpiry,
        ProposalSource::Perception,
        ProposalSource::ContinuousEval,
        ProposalSource::Contrast,
    ]
}

// ============================================================================
// SECTION: Commitment Request
// ============================================================================

/// Details needed to materialize a commitment lease on a successful
/// Commitment gate transition.
#[derive(Debug, Clone)]
pub struct CommitmentRequest {
    /// Short description of what the commitment is about.
    pub frame: String,
    /// Planning horizon.
    pub horizon: Horizon,
    /// Ordered success criteria.
    pub success_criteria: Vec<String>,
    /// Ordered non-goals (advisory only).
    pub non_goals: Vec<String>,
    /// Initial turn budget.
    pub turns: u32,
    /// Prompt shown when the renewal decision is due.
    pub renewal_prompt: String,
}

// ============================================================================
// SECTION: Gate Controller Config
// ============================================================================

/// Default for [`GateControllerConfig::emergency_cooldown_turns`], per
/// spec.md §6.
const fn default_emergency_cooldown_turns() -> u32 {
    3
}

/// Default for [`GateControllerConfig::emergency_commitment_reset_turns`].
const fn default_emergency_commitment_reset_turns() -> u32 {
    5
}

/// Tunable knobs for the Gate Controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GateControllerConfig {
    /// Turns that must elapse between successful Emergency gates.
    #[serde(default = "default_emergency_cooldown_turns")]
    pub emergency_cooldown_turns: u32,
    /// Turn budget an Emergency reset restores to the active commitment
    /// lease's clock, when one exists.
    #[serde(default = "default_emergency_commitment_reset_turns")]
    pub emergency_commitment_reset_turns: u32,
}

impl Default for GateControllerConfig {
    fn default() -> Self {
        Self {
            emergency_cooldown_turns: default_emergency_cooldown_turns(),
            emergency_commitment_reset_turns: default_emergency_commitment_reset_turns(),
        }
    }
}

// ============================================================================
// SECTION: Gate Controller
// ============================================================================

/// The arbiter of authority.
#[derive(Debug, Clone)]
pub struct GateController {
    /// Owner of the current stance.
    stance: StanceMachine,
    /// Owner of the active commitment lease.
    commitment: CommitmentManager,
    /// Tunable knobs.
    config: GateControllerConfig,
    /// Turns remaining before another Emergency gate is honored.
    cooldown_remaining: u32,
}

impl GateController {
    /// Creates a new controller with no cooldown in effect.
    #[must_use]
    pub fn new(config: GateControllerConfig) -> Self {
        Self {
            stance: StanceMachine::new(),
            commitment: CommitmentManager::new(),
            config,
            cooldown_remaining: 0,
        }
    }

    /// Returns the current stance.
    #[must_use]
    pub const fn stance(&self) -> Stance {
        self.stance.current()
    }

    /// Returns the active commitment lease, if any.
    #[must_use]
    pub const fn commitment(&self) -> Option<&CommitmentLease> {
        self.commitment.current()
    }

    /// Decrements the active commitment lease's turn budget by one. Must be
    /// called exactly once per turn, alongside [`Self::tick`], per spec.md
    /// §4.2's "decreases by exactly one per turn while active" invariant.
    ///
    /// Returns `true` while the lease is still active after the tick, or
    /// `false` when there was no active lease.
    pub fn commitment_tick(&mut self) -> bool {
        self.commitment.tick()
    }

    /// Emits a `Commitment` gate-request proposal when the active lease's
    /// turn budget has reached zero, per spec.md §4.2. Callers should invoke
    /// this during the sense phase, after the prior turn's
    /// [`Self::commitment_tick`] has run.
    #[must_use]
    pub fn commitment_check_expiry(&self, proposal_id: ProposalId) -> Option<Proposal> {
        self.commitment.check_expiry(proposal_id)
    }

    /// Returns true when an Emergency gate would currently be honored.
    #[must_use]
    pub const fn emergency_ready(&self) -> bool {
        self.cooldown_remaining == 0
    }

    /// Attempts a non-emergency gate transition to `target`.
    pub fn attempt_gate(
        &mut self,
        kind: GateKind,
        target: Stance,
        reason: impl Into<String>,
        commitment_request: Option<CommitmentRequest>,
        turn: TurnId,
        at: Timestamp,
    ) -> GateResult {
        debug_assert!(kind != GateKind::Emergency, "attempt_emergency handles the Emergency gate");
        let reason = reason.into();
        let from = self.stance.current();
        match self.stance.transition(target, kind) {
            Ok(previous) => {
                self.on_successful_transition(kind, commitment_request);
                GateResult {
                    gate: kind,
                    approved: true,
                    from_stance: previous,
                    to_stance: target,
                    reason,
                    error: None,
                    turn,
                    at,
                }
            },
            Err(error) => GateResult {
                gate: kind,
                approved: false,
                from_stance: from,
                to_stance: from,
                reason,
                error: Some(error.to_string()),
                turn,
                at,
            },
        }
    }

    /// Attempts an Emergency gate. Honored only when the cooldown has
    /// elapsed; forces Sensemaking, resets the cooldown, and resets (but
    /// does not clear) the active commitment's turn clock.
    pub fn attempt_emergency(&mut self, reason: impl Into<String>, turn: TurnId, at: Timestamp) -> GateResult {
        let reason = reason.into();
        let from = self.stance.current();
        if !self.emergency_ready() {
            return GateResult {
                gate: GateKind::Emergency,
                approved: false,
                from_stance: from,
                to_stance: from,
                reason,
                error: Some(format!("emergency cooldown active: {} turns remaining", self.cooldown_remaining)),
                turn,
                at,
            };
        }
        let previous = self
            .stance
            .transition(Stance::Sensemaking, GateKind::Emergency)
            .unwrap_or_else(|_| unreachable!("Emergency always permits Sensemaking"));
        self.cooldown_remaining = self.config.emergency_cooldown_turns;
        if self.commitment.current().is_some() {
            let _ = self.commitment.renew(self.config.emergency_commitment_reset_turns);
        }
        GateResult {
            gate: GateKind::Emergency,
            approved: true,
            from_stance: previous,
            to_stance: Stance::Sensemaking,
            reason,
            error: None,
            turn,
            at,
        }
    }

    /// Evaluates every buffered gate-request proposal for one turn, per the
    /// ordering rules in spec.md §4.3:
    /// 1. At most one Emergency gate, processed first, when any proposal is
    ///    emergency severity.
    /// 2. Remaining proposals grouped by source in `priority_order`, with
    ///    insertion order preserved within a group.
    pub fn process_proposals(
        &mut self,
        buffer: &ProposalBuffer,
        priority_order: &[ProposalSource],
        turn: TurnId,
        at: Timestamp,
    ) -> Vec<GateResult> {
        let mut results = Vec::new();
        if buffer.has_emergency() {
            results.push(self.attempt_emergency("emergency-severity proposal", turn, at));
        }
        for proposal in buffer.get_gate_proposals(priority_order) {
            let Some((gate, _severity)) = proposal.kind.as_gate_request() else {
                continue;
            };
            if gate.as_str() == "emergency" {
                continue;
            }
            let Some((kind, target)) = resolve_gate(gate.as_str(), self.stance.current()) else {
                continue;
            };
            results.push(self.attempt_gate(kind, target, gate.as_str().to_string(), None, turn, at));
        }
        results
    }

    /// Advances the emergency cooldown. Must be called exactly once per
    /// turn.
    pub fn tick(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }

    /// Materializes or clears the commitment lease as a side effect of a
    /// successful stance transition.
    fn on_successful_transition(&mut self, kind: GateKind, commitment_request: Option<CommitmentRequest>) {
        match kind {
            GateKind::Commitment => {
                if let Some(request) = commitment_request {
                    let _ = self.commitment.create(
                        request.frame,
                        request.horizon,
                        request.success_criteria,
                        request.non_goals,
                        request.turns,
                        request.renewal_prompt,
                    );
                }
            },
            GateKind::Evaluation => {
                self.commitment.expire();
            },
            _ => {},
        }
    }
}

/// Maps a requested gate name to a `(GateKind, target Stance)` pair, given
/// the current stance. Returns `None` for names the kernel does not
/// recognize as a stance-moving gate (e.g. `write_approval`, `lane_switch`).
fn resolve_gate(gate_name: &str, current: Stance) -> Option<(GateKind, Stance)> {
    match gate_name {
        "framing" => Some((GateKind::Framing, Stance::Discovery)),
        "commitment" => Some((GateKind::Commitment, Stance::Execution)),
        "evaluation" => {
            let target = if current == Stance::Evaluation { Stance::Execution } else { Stance::Evaluation };
            Some((GateKind::Evaluation, target))
        },
        _ => None,
    }
}

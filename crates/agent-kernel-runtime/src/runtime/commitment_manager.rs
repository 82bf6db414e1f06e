// agent-kernel-runtime/src/runtime/commitment_manager.rs
// ============================================================================
// Module: Commitment Manager
// Description: Lifecycle owner of the at-most-one active commitment lease.
// Purpose: Implement create/renew/expire/tick/check_expiry per spec.md §4.2.
// Dependencies: agent_kernel_core::{CommitmentLease, Horizon, Proposal, ...}
// ============================================================================

//! ## Overview
//! The Commitment Manager owns the single optional active lease. Creation is
//! gated: only the Gate Controller, after a successful Commitment transition,
//! may call [`CommitmentManager::create`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_kernel_core::CommitmentLease;
use agent_kernel_core::GateRequestName;
use agent_kernel_core::Horizon;
use agent_kernel_core::Proposal;
use agent_kernel_core::ProposalId;
use agent_kernel_core::ProposalKind;
use agent_kernel_core::ProposalSource;
use agent_kernel_core::Severity;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Commitment Manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitmentError {
    /// A lease already exists; only one may be active at a time.
    #[error("a commitment lease is already active")]
    AlreadyActive,
    /// No lease exists to renew or expire.
    #[error("no active commitment lease")]
    NoActiveLease,
}

// ============================================================================
// SECTION: Commitment Manager
// ============================================================================

/// Owner of the at-most-one active commitment lease.
#[derive(Debug, Clone, Default)]
pub struct CommitmentManager {
    /// The single active lease, if any.
    lease: Option<CommitmentLease>,
}

impl CommitmentManager {
    /// Creates a manager with no active lease.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lease: None,
        }
    }

    /// Returns the current lease, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&CommitmentLease> {
        self.lease.as_ref()
    }

    /// Creates a new lease. Callers must have already confirmed, via the
    /// Gate Controller, that this call follows a successful Commitment gate
    /// transition.
    ///
    /// # Errors
    ///
    /// Returns [`CommitmentError::AlreadyActive`] when a lease already
    /// exists.
    pub fn create(
        &mut self,
        frame: impl Into<String>,
        horizon: Horizon,
        success_criteria: Vec<String>,
        non_goals: Vec<String>,
        turns: u32,
        renewal_prompt: impl Into<String>,
    ) -> Result<&CommitmentLease, CommitmentError> {
        if self.lease.is_some() {
            return Err(CommitmentError::AlreadyActive);
        }
        self.lease = Some(CommitmentLease::new(
            frame,
            horizon,
            success_criteria,
            non_goals,
            turns,
            renewal_prompt,
        ));
        Ok(self.lease.as_ref().unwrap_or_else(|| unreachable!("lease just inserted")))
    }

    /// Renews the active lease with a fresh turn budget.
    ///
    /// # Errors
    ///
    /// Returns [`CommitmentError::NoActiveLease`] when no lease is active.
    pub fn renew(&mut self, turns: u32) -> Result<(), CommitmentError> {
        let lease = self.lease.as_mut().ok_or(CommitmentError::NoActiveLease)?;
        lease.renew(turns);
        Ok(())
    }

    /// Clears the active lease. Callable only by Evaluation or Emergency
    /// gate handling in the Gate Controller.
    pub fn expire(&mut self) {
        self.lease = None;
    }

    /// Decrements the active lease's turn budget by one.
    ///
    /// Returns `true` while the lease is still active after the tick, or
    /// `false` when there was no active lease.
    pub fn tick(&mut self) -> bool {
        match self.lease.as_mut() {
            Some(lease) => lease.tick(),
            None => false,
        }
    }

    /// Emits a `Commitment` gate-request proposal with `severity = high`
    /// suggesting Evaluation, when the active lease's turn budget has
    /// reached zero, per spec.md §4.2.
    #[must_use]
    pub fn check_expiry(&self, proposal_id: ProposalId) -> Option<Proposal> {
        let lease = self.lease.as_ref()?;
        if !lease.is_expired() {
            return None;
        }
        Some(Proposal::new(
            proposal_id,
            ProposalKind::GateRequest {
                gate: GateRequestName::new("evaluation"),
                reason: "commitment turn budget exhausted".to_string(),
                severity: Severity::High,
            },
            ProposalSource::CommitmentExpiry,
        ))
    }
}

// agent-kernel-runtime/src/runtime/delegation_manager.rs
// ============================================================================
// Module: Delegation Manager
// Description: Owner of every capability lease granted to an agent.
// Purpose: Implement grant/revoke/check/tick/get_summary per spec.md §4.10.
// Dependencies: agent_kernel_core::{DelegationLease, AgentId, CapabilityId}
// ============================================================================

//! ## Overview
//! Leases are the only mechanism by which non-kernel code may invoke a
//! capability. An unauthorized attempt fails with [`DelegationError::Unauthorized`]
//! and proposes a Framing gate (severity low) so the user or authority can
//! choose to grant it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use agent_kernel_core::AgentId;
use agent_kernel_core::CapabilityId;
use agent_kernel_core::DelegationLease;
use agent_kernel_core::GateRequestName;
use agent_kernel_core::Proposal;
use agent_kernel_core::ProposalId;
use agent_kernel_core::ProposalKind;
use agent_kernel_core::ProposalSource;
use agent_kernel_core::Severity;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Delegation Manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DelegationError {
    /// `grantee` holds no active lease authorizing `capability`.
    #[error("{grantee} is not authorized for {capability}")]
    Unauthorized {
        /// Agent that attempted the capability.
        grantee: AgentId,
        /// Capability attempted.
        capability: CapabilityId,
    },
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// A point-in-time view of every grantee's authorized capabilities.
pub type DelegationSummary = BTreeMap<AgentId, BTreeSet<CapabilityId>>;

// ============================================================================
// SECTION: Delegation Manager
// ============================================================================

/// Owner of every capability lease.
#[derive(Debug, Clone, Default)]
pub struct DelegationManager {
    /// Leases keyed by grantee; a grantee may hold several leases with
    /// disjoint scopes and expiries.
    leases: BTreeMap<AgentId, Vec<DelegationLease>>,
}

impl DelegationManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            leases: BTreeMap::new(),
        }
    }

    /// Grants a new lease.
    pub fn grant(&mut self, lease: DelegationLease) {
        self.leases.entry(lease.grantee.clone()).or_default().push(lease);
    }

    /// Revokes every lease held by `grantee`, or only those covering
    /// `scope` when given.
    pub fn revoke(&mut self, grantee: &AgentId, scope: Option<&CapabilityId>) {
        let Some(leases) = self.leases.get_mut(grantee) else {
            return;
        };
        match scope {
            Some(scope) => {
                for lease in leases.iter_mut() {
                    lease.scope.remove(scope);
                }
                leases.retain(|lease| !lease.scope.is_empty());
            },
            None => leases.clear(),
        }
        if leases.is_empty() {
            self.leases.remove(grantee);
        }
    }

    /// Returns true when `grantee` holds an active lease authorizing
    /// `capability`.
    #[must_use]
    pub fn check(&self, grantee: &AgentId, capability: &CapabilityId) -> bool {
        self.leases
            .get(grantee)
            .is_some_and(|leases| leases.iter().any(|lease| lease.authorizes(capability)))
    }

    /// Attempts to authorize `capability` for `grantee`. On denial, also
    /// returns a Framing gate-request proposal (severity low) the caller
    /// should buffer so authority can choose to grant the capability.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError::Unauthorized`] when no active lease
    /// covers the capability.
    pub fn authorize(
        &self,
        grantee: &AgentId,
        capability: &CapabilityId,
        proposal_id: ProposalId,
    ) -> Result<(), (DelegationError, Proposal)> {
        if self.check(grantee, capability) {
            return Ok(());
        }
        let proposal = Proposal::new(
            proposal_id,
            ProposalKind::GateRequest {
                gate: GateRequestName::new("framing"),
                reason: format!("{grantee} attempted unauthorized capability {capability}"),
                severity: Severity::Low,
            },
            ProposalSource::Agent,
        );
        Err((
            DelegationError::Unauthorized {
                grantee: grantee.clone(),
                capability: capability.clone(),
            },
            proposal,
        ))
    }

    /// Decrements every lease's turn budget by one, dropping leases that
    /// reach zero.
    pub fn tick(&mut self) {
        for leases in self.leases.values_mut() {
            for lease in leases.iter_mut() {
                lease.tick();
            }
            leases.retain(|lease| !lease.is_expired());
        }
        self.leases.retain(|_, leases| !leases.is_empty());
    }

    /// Returns a snapshot of every grantee's currently authorized
    /// capabilities, merged across their leases.
    #[must_use]
    pub fn get_summary(&self) -> DelegationSummary {
        self.leases
            .iter()
            .map(|(grantee, leases)| {
                let scopes = leases.iter().filter(|lease| !lease.is_expired()).flat_map(|lease| lease.scope.clone()).collect();
                (grantee.clone(), scopes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use agent_kernel_core::Timestamp;

    use super::*;

    fn lease(grantee: &str, capability: &str, turns: u32) -> DelegationLease {
        DelegationLease::new(
            AgentId::new(grantee),
            BTreeSet::from([CapabilityId::new(capability)]),
            turns,
            Timestamp::Logical(0),
        )
    }

    #[test]
    fn check_reflects_granted_scope() {
        let mut manager = DelegationManager::new();
        manager.grant(lease("writer", "fs.write", 3));
        assert!(manager.check(&AgentId::new("writer"), &CapabilityId::new("fs.write")));
        assert!(!manager.check(&AgentId::new("writer"), &CapabilityId::new("fs.read")));
    }

    #[test]
    fn authorize_denial_proposes_framing_gate() {
        let manager = DelegationManager::new();
        let result = manager.authorize(&AgentId::new("writer"), &CapabilityId::new("fs.write"), ProposalId::new("p1"));
        let (error, proposal) = result.expect_err("should be unauthorized");
        assert_eq!(
            error,
            DelegationError::Unauthorized {
                grantee: AgentId::new("writer"),
                capability: CapabilityId::new("fs.write"),
            }
        );
        assert_eq!(proposal.kind.as_gate_request().map(|(_, severity)| severity), Some(Severity::Low));
    }

    #[test]
    fn tick_drops_expired_leases() {
        let mut manager = DelegationManager::new();
        manager.grant(lease("writer", "fs.write", 1));
        manager.tick();
        assert!(!manager.check(&AgentId::new("writer"), &CapabilityId::new("fs.write")));
        assert!(manager.get_summary().is_empty());
    }

    #[test]
    fn revoke_removes_scope_and_drops_empty_leases() {
        let mut manager = DelegationManager::new();
        manager.grant(lease("writer", "fs.write", 3));
        manager.revoke(&AgentId::new("writer"), Some(&CapabilityId::new("fs.write")));
        assert!(!manager.check(&AgentId::new("writer"), &CapabilityId::new("fs.write")));
    }
}

// agent-kernel-core/src/core/delegation.rs
// ============================================================================
// Module: Agent Kernel Delegation
// Description: Capability leases granted to agents by authority.
// Purpose: Define DelegationLease, the only mechanism by which non-kernel
// code may invoke a capability.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A delegation lease is inert data describing a capability grant; the
//! Delegation Manager in the runtime crate owns granting, revocation, and
//! per-turn ticking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::CapabilityId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Delegation Lease
// ============================================================================

/// A time-bounded capability grant to a named grantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationLease {
    /// Agent this lease was granted to.
    pub grantee: AgentId,
    /// Capability scopes this lease authorizes.
    pub scope: BTreeSet<CapabilityId>,
    /// Turns remaining before the lease expires.
    pub expires_turns: u32,
    /// Timestamp the lease was granted.
    pub created_at: Timestamp,
}

impl DelegationLease {
    /// Creates a new lease.
    #[must_use]
    pub const fn new(
        grantee: AgentId,
        scope: BTreeSet<CapabilityId>,
        expires_turns: u32,
        created_at: Timestamp,
    ) -> Self {
        Self {
            grantee,
            scope,
            expires_turns,
            created_at,
        }
    }

    /// Returns true when `capability` is within this lease's scope and the
    /// lease has not yet expired.
    #[must_use]
    pub fn authorizes(&self, capability: &CapabilityId) -> bool {
        self.expires_turns > 0 && self.scope.contains(capability)
    }

    /// Decrements the remaining turn budget by one, saturating at zero.
    pub fn tick(&mut self) {
        self.expires_turns = self.expires_turns.saturating_sub(1);
    }

    /// Returns true when the lease has no turns remaining.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.expires_turns == 0
    }
}

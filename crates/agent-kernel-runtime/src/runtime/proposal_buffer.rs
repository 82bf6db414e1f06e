// agent-kernel-runtime/src/runtime/proposal_buffer.rs
// ============================================================================
// Module: Proposal Buffer
// Description: Write-once-per-turn store for advisory proposals.
// Purpose: Collect proposals from the firewall, sensors, and detectors for
// the Gate Controller to arbitrate, per spec.md §4.4.
// Dependencies: agent_kernel_core::{Proposal, ProposalKind, ProposalSource}
// ============================================================================

//! ## Overview
//! The buffer accepts proposals from the packet firewall, the perception
//! sensor, the continuous evaluator, and the contrast detector. It is
//! cleared by the turn driver only after the Gate Controller has processed
//! the turn.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_kernel_core::Proposal;
use agent_kernel_core::ProposalKind;
use agent_kernel_core::ProposalSource;
use agent_kernel_core::Severity;

// ============================================================================
// SECTION: Proposal Buffer
// ============================================================================

/// Write-once-per-turn proposal store.
#[derive(Debug, Clone, Default)]
pub struct ProposalBuffer {
    /// Buffered proposals, in insertion order.
    proposals: Vec<Proposal>,
}

impl ProposalBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            proposals: Vec::new(),
        }
    }

    /// Appends a proposal to the buffer.
    pub fn add(&mut self, proposal: Proposal) {
        self.proposals.push(proposal);
    }

    /// Returns every buffered proposal for which `predicate` matches its
    /// kind, in insertion order.
    #[must_use]
    pub fn get_by_kind<F>(&self, predicate: F) -> Vec<&Proposal>
    where
        F: Fn(&ProposalKind) -> bool,
    {
        self.proposals.iter().filter(|proposal| predicate(&proposal.kind)).collect()
    }

    /// Returns true when any buffered proposal is an emergency-severity gate
    /// request.
    #[must_use]
    pub fn has_emergency(&self) -> bool {
        self.proposals.iter().any(Proposal::is_emergency)
    }

    /// Returns gate-request proposals ordered for Gate Controller
    /// processing, per spec.md §4.3:
    ///
    /// 1. Grouped by source, in `priority_order`; sources absent from
    ///    `priority_order` are dropped.
    /// 2. Within a group, insertion order.
    /// 3. Duplicate requests (same gate name and source) collapse to the
    ///    highest-severity instance, retained at its first occurrence
    ///    position within the group.
    #[must_use]
    pub fn get_gate_proposals(&self, priority_order: &[ProposalSource]) -> Vec<&Proposal> {
        let mut ordered = Vec::new();
        for source in priority_order {
            let mut seen: Vec<(String, usize)> = Vec::new();
            let mut group: Vec<&Proposal> = Vec::new();
            for proposal in &self.proposals {
                if proposal.source != *source {
                    continue;
                }
                let Some((gate, severity)) = proposal.kind.as_gate_request() else {
                    continue;
                };
                let gate_key = gate.as_str().to_string();
                if let Some(&(_, existing_index)) = seen.iter().find(|(key, _)| *key == gate_key) {
                    let existing_severity =
                        group[existing_index].kind.as_gate_request().map_or(Severity::Low, |(_, sev)| sev);
                    if severity > existing_severity {
                        group[existing_index] = proposal;
                    }
                } else {
                    seen.push((gate_key, group.len()));
                    group.push(proposal);
                }
            }
            ordered.extend(group);
        }
        ordered
    }

    /// Clears every buffered proposal. Call only after the Gate Controller
    /// has processed the turn.
    pub fn clear(&mut self) {
        self.proposals.clear();
    }

    /// Returns the number of buffered proposals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Returns true when the buffer holds no proposals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}

// agent-kernel-core/src/core/memory.rs
// ============================================================================
// Module: Agent Kernel Memory Tiers
// Description: The four memory tiers and the write-signal envelope the
// Write Gate evaluates.
// Purpose: Define MemoryTier, WriteSignals, and the per-tier record types.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Memory is split into four tiers with different lifetimes and different
//! write policies, enforced by the runtime's Write Gate:
//! - Working: keyed by `(problem_id, key)`, TTL-bounded, no gate.
//! - Shared: keyed by key, versioned, gated on quality/alignment.
//! - Episodic: append-only; see [`crate::core::event`].
//! - Semantic: pattern records, gated on no-conflict + high quality +
//!   high alignment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EventId;
use crate::core::identifiers::PatternId;
use crate::core::identifiers::ProblemId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Memory Tier
// ============================================================================

/// The four memory tiers recognized by the Memory Bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    /// Session- and problem-scoped scratch memory.
    Working,
    /// Cross-problem versioned memory.
    Shared,
    /// Append-only event history.
    Episodic,
    /// Distilled long-term pattern records.
    Semantic,
}

// ============================================================================
// SECTION: Write Signals
// ============================================================================

/// Conflict level reported alongside a Shared or Semantic write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictLevel {
    /// No known conflict with existing memory.
    None,
    /// Minor conflict.
    Low,
    /// Moderate conflict.
    Medium,
    /// Severe conflict.
    High,
}

/// Scope of impact a write would have if admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastRadius {
    /// Affects only the originating problem/session.
    Local,
    /// Affects all sessions working the same problem.
    Problem,
    /// Affects every problem sharing this memory store.
    Global,
}

/// Inputs the Write Gate evaluates for a Shared or Semantic write attempt.
///
/// This is the single source of signal the gate consults; it is
/// deliberately disjoint from [`crate::core::audit::AuditEvent::emotional_signals`],
/// which never participates in a write or policy decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WriteSignals {
    /// Estimated progress this write represents, e.g. for UI purposes.
    pub progress_delta: f64,
    /// Degree of conflict with existing memory.
    pub conflict_level: ConflictLevel,
    /// Source reliability in `[0.0, 1.0]`.
    pub source_quality: f64,
    /// Alignment with the session's goals in `[0.0, 1.0]`.
    pub alignment_score: f64,
    /// Scope of impact if the write is admitted.
    pub blast_radius: BlastRadius,
}

// ============================================================================
// SECTION: Working Memory Entry
// ============================================================================

/// A single working-memory entry, isolated per problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingEntry {
    /// Problem this entry is scoped to.
    pub problem_id: ProblemId,
    /// Entry key, unique within `problem_id`.
    pub key: String,
    /// Entry value.
    pub value: Value,
    /// Time after which this entry is erased.
    pub expires_at: Timestamp,
}

// ============================================================================
// SECTION: Shared Memory Entry
// ============================================================================

/// A single shared-memory entry with monotonic versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedEntry {
    /// Entry key.
    pub key: String,
    /// Current value.
    pub value: Value,
    /// Monotonically increasing version, incremented on every accepted
    /// write.
    pub version: u64,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

impl SharedEntry {
    /// Returns true when `expected_version` matches this entry's current
    /// version, the precondition for a compare-and-swap write.
    #[must_use]
    pub const fn matches_version(&self, expected_version: u64) -> bool {
        self.version == expected_version
    }
}

// ============================================================================
// SECTION: Semantic Pattern Record
// ============================================================================

/// A distilled long-term pattern learned from repeated evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    /// Unique pattern identifier.
    pub id: PatternId,
    /// Pattern category (caller-defined taxonomy).
    pub pattern_type: String,
    /// Signature describing the trigger conditions this pattern matches.
    pub trigger_signature: String,
    /// Action recommended when the trigger signature is observed again.
    pub recommended_action: String,
    /// Confidence in `[0.0, 1.0]`, adjusted by
    /// `strengthen_pattern`/`weaken_pattern`.
    pub confidence: f64,
    /// Episodic events supporting this pattern.
    pub evidence_ids: Vec<EventId>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Timestamp of the last strengthening, if any.
    pub last_strengthened_at: Option<Timestamp>,
}

impl PatternRecord {
    /// Increments confidence by `0.05`, clamped to `1.0`, and appends
    /// `evidence_id`, per spec.md §4.8.
    pub fn strengthen(&mut self, evidence_id: EventId, at: Timestamp) {
        self.confidence = (self.confidence + 0.05).min(1.0);
        self.evidence_ids.push(evidence_id);
        self.last_strengthened_at = Some(at);
    }

    /// Decrements confidence by `0.1`, clamped to `0.0`, per spec.md §4.8.
    pub fn weaken(&mut self) {
        self.confidence = (self.confidence - 0.1).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_version_checks_equality() {
        let entry = SharedEntry {
            key: "k".to_string(),
            value: Value::Null,
            version: 3,
            updated_at: Timestamp::Logical(0),
        };
        assert!(entry.matches_version(3));
        assert!(!entry.matches_version(2));
    }

    #[test]
    fn strengthen_clamps_to_one() {
        let mut pattern = PatternRecord {
            id: PatternId::new("p1"),
            pattern_type: "retry_storm".to_string(),
            trigger_signature: "tool=fs.read_file status=timeout".to_string(),
            recommended_action: "back off and retry".to_string(),
            confidence: 0.98,
            evidence_ids: vec![],
            created_at: Timestamp::Logical(0),
            last_strengthened_at: None,
        };
        pattern.strengthen(EventId::new("e1"), Timestamp::Logical(1));
        assert!((pattern.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn weaken_clamps_to_zero() {
        let mut pattern = PatternRecord {
            id: PatternId::new("p1"),
            pattern_type: "retry_storm".to_string(),
            trigger_signature: "tool=fs.read_file status=timeout".to_string(),
            recommended_action: "back off and retry".to_string(),
            confidence: 0.02,
            evidence_ids: vec![],
            created_at: Timestamp::Logical(0),
            last_strengthened_at: None,
        };
        pattern.weaken();
        assert!(pattern.confidence.abs() < f64::EPSILON);
    }
}

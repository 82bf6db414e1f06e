// agent-kernel-runtime/src/runtime/memory_bus.rs
// ============================================================================
// Module: Memory Bus and Write Gate
// Description: Unified access to the four memory tiers, gated on write
// policy.
// Purpose: Implement the tier-specific write policies and versioning from
// spec.md §4.8.
// Dependencies: agent_kernel_core::{WorkingEntry, SharedEntry, PatternRecord,
// WriteSignals, ConflictLevel, BlastRadius, MemoryTier}
// ============================================================================

//! ## Overview
//! Working and Episodic writes always succeed; Shared and Semantic writes
//! are evaluated against [`WriteSignals`] before being admitted. Shared
//! writes are versioned with a bounded history; Semantic writes distill
//! into [`PatternRecord`]s that strengthen or weaken with further evidence.
//!
//! Pattern and shared-entry identifiers are supplied by the caller rather
//! than generated here, consistent with every other identifier in this
//! kernel (see [`agent_kernel_core::identifiers`]); the bus itself never
//! manufactures state nondeterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use agent_kernel_core::BlastRadius;
use agent_kernel_core::ConflictLevel;
use agent_kernel_core::EventId;
use agent_kernel_core::PatternId;
use agent_kernel_core::PatternRecord;
use agent_kernel_core::ProblemId;
use agent_kernel_core::SharedEntry;
use agent_kernel_core::Timestamp;
use agent_kernel_core::WorkingEntry;
use agent_kernel_core::WriteSignals;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Memory Bus.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryBusError {
    /// A compare-and-swap write's `expected_version` did not match the
    /// entry's current version.
    #[error("version conflict on {key}: expected {expected}, found {found}")]
    VersionConflict {
        /// Key being written.
        key: String,
        /// Version the caller expected.
        expected: u64,
        /// Version actually stored.
        found: u64,
    },
    /// The Write Gate denied a Shared or Semantic write.
    #[error("write denied: {0}")]
    Denied(String),
    /// No pattern exists with the given id.
    #[error("no pattern with id {0}")]
    PatternNotFound(PatternId),
}

// ============================================================================
// SECTION: Write Gate Config
// ============================================================================

/// Default for [`WriteGateConfig::min_source_quality`], per spec.md §6.
const fn default_min_source_quality() -> f64 {
    0.3
}

/// Default for [`WriteGateConfig::min_alignment`], per spec.md §6.
const fn default_min_alignment() -> f64 {
    0.4
}

/// Default for [`WriteGateConfig::blast_radius_threshold`], per spec.md §6.
const fn default_blast_radius_threshold() -> f64 {
    0.7
}

/// Default for [`WriteGateConfig::semantic_min_source_quality`].
const fn default_semantic_min_source_quality() -> f64 {
    0.5
}

/// Default for [`WriteGateConfig::semantic_min_alignment`].
const fn default_semantic_min_alignment() -> f64 {
    0.6
}

/// Default for [`WriteGateConfig::shared_history_cap`].
const fn default_shared_history_cap() -> usize {
    20
}

/// Tunable thresholds for the Write Gate, per spec.md §4.8.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WriteGateConfig {
    /// Minimum `source_quality` for a Shared write.
    #[serde(default = "default_min_source_quality")]
    pub min_source_quality: f64,
    /// Minimum `alignment_score` for a Shared write.
    #[serde(default = "default_min_alignment")]
    pub min_alignment: f64,
    /// Minimum `source_quality` required when `blast_radius = Global`.
    #[serde(default = "default_blast_radius_threshold")]
    pub blast_radius_threshold: f64,
    /// Minimum `source_quality` for a Semantic write.
    #[serde(default = "default_semantic_min_source_quality")]
    pub semantic_min_source_quality: f64,
    /// Minimum `alignment_score` for a Semantic write.
    #[serde(default = "default_semantic_min_alignment")]
    pub semantic_min_alignment: f64,
    /// Maximum prior versions retained per Shared key.
    #[serde(default = "default_shared_history_cap")]
    pub shared_history_cap: usize,
}

impl Default for WriteGateConfig {
    fn default() -> Self {
        Self {
            min_source_quality: default_min_source_quality(),
            min_alignment: default_min_alignment(),
            blast_radius_threshold: default_blast_radius_threshold(),
            semantic_min_source_quality: default_semantic_min_source_quality(),
            semantic_min_alignment: default_semantic_min_alignment(),
            shared_history_cap: default_shared_history_cap(),
        }
    }
}

/// Evaluates whether a Shared write is admitted under `config`.
#[must_use]
pub fn evaluate_shared_write(signals: &WriteSignals, config: &WriteGateConfig) -> Result<(), String> {
    if signals.source_quality < config.min_source_quality {
        return Err(format!("source_quality {} below minimum {}", signals.source_quality, config.min_source_quality));
    }
    if signals.alignment_score < config.min_alignment {
        return Err(format!("alignment_score {} below minimum {}", signals.alignment_score, config.min_alignment));
    }
    if signals.blast_radius == BlastRadius::Global && signals.source_quality <= config.blast_radius_threshold {
        return Err(format!(
            "global blast radius requires source_quality above {}",
            config.blast_radius_threshold
        ));
    }
    Ok(())
}

/// Evaluates whether a Semantic write is admitted under `config`.
#[must_use]
pub fn evaluate_semantic_write(signals: &WriteSignals, config: &WriteGateConfig) -> Result<(), String> {
    if signals.conflict_level != ConflictLevel::None {
        return Err(format!("conflict_level is {:?}, not None", signals.conflict_level));
    }
    if signals.source_quality < config.semantic_min_source_quality {
        return Err(format!(
            "source_quality {} below minimum {}",
            signals.source_quality, config.semantic_min_source_quality
        ));
    }
    if signals.alignment_score < config.semantic_min_alignment {
        return Err(format!(
            "alignment_score {} below minimum {}",
            signals.alignment_score, config.semantic_min_alignment
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Memory Bus
// ============================================================================

/// Unified access to the four memory tiers.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    /// Working-memory entries keyed by `(problem_id, key)`.
    working: BTreeMap<(ProblemId, String), WorkingEntry>,
    /// Current Shared-memory entries keyed by key.
    shared: BTreeMap<String, SharedEntry>,
    /// Prior Shared-memory versions, most recent last, bounded by
    /// `shared_history_cap`.
    shared_history: BTreeMap<String, Vec<SharedEntry>>,
    /// Semantic pattern records keyed by id.
    semantic: BTreeMap<PatternId, PatternRecord>,
    /// Write Gate thresholds.
    config: WriteGateConfig,
}

impl MemoryBus {
    /// Creates an empty bus with the given Write Gate config.
    #[must_use]
    pub fn new(config: WriteGateConfig) -> Self {
        Self {
            working: BTreeMap::new(),
            shared: BTreeMap::new(),
            shared_history: BTreeMap::new(),
            semantic: BTreeMap::new(),
            config,
        }
    }

    // -- Working tier --------------------------------------------------

    /// Writes a Working-memory entry. Always allowed.
    pub fn write_working(&mut self, entry: WorkingEntry) {
        self.working.insert((entry.problem_id.clone(), entry.key.clone()), entry);
    }

    /// Reads a Working-memory entry, returning `None` once it has expired as
    /// of `now`, per spec.md §4.8's "erased on expiry" rule. The entry is
    /// not removed here; callers that run a turn loop should also call
    /// [`Self::evict_expired_working`] once per turn so expired entries do
    /// not linger indefinitely.
    #[must_use]
    pub fn read_working(&self, problem_id: &ProblemId, key: &str, now: Timestamp) -> Option<&WorkingEntry> {
        let entry = self.working.get(&(problem_id.clone(), key.to_string()))?;
        if entry.expires_at <= now {
            return None;
        }
        Some(entry)
    }

    /// Removes every Working-memory entry expired as of `now`. Returns the
    /// number of entries removed. Callers should invoke this once per turn,
    /// during the sense phase, the same way lane-lease expiry is swept.
    pub fn evict_expired_working(&mut self, now: Timestamp) -> usize {
        let before = self.working.len();
        self.working.retain(|_, entry| entry.expires_at > now);
        before - self.working.len()
    }

    // -- Shared tier ------------------------------------------------------

    /// Writes a Shared-memory entry, subject to the Write Gate and an
    /// optional compare-and-swap `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::VersionConflict`] when `expected_version`
    /// does not match the current version, or
    /// [`MemoryBusError::Denied`] when the Write Gate rejects the write.
    pub fn write_shared(
        &mut self,
        key: impl Into<String>,
        value: Value,
        expected_version: Option<u64>,
        signals: &WriteSignals,
        now: Timestamp,
    ) -> Result<&SharedEntry, MemoryBusError> {
        let key = key.into();
        if let Some(expected) = expected_version {
            let found = self.shared.get(&key).map_or(0, |entry| entry.version);
            if found != expected {
                return Err(MemoryBusError::VersionConflict {
                    key,
                    expected,
                    found,
                });
            }
        }
        evaluate_shared_write(signals, &self.config).map_err(MemoryBusError::Denied)?;

        let next_version = self.shared.get(&key).map_or(1, |entry| entry.version + 1);
        if let Some(previous) = self.shared.insert(
            key.clone(),
            SharedEntry {
                key: key.clone(),
                value,
                version: next_version,
                updated_at: now,
            },
        ) {
            let history = self.shared_history.entry(key.clone()).or_default();
            history.push(previous);
            if history.len() > self.config.shared_history_cap {
                history.remove(0);
            }
        }
        Ok(self.shared.get(&key).unwrap_or_else(|| unreachable!("entry just inserted")))
    }

    /// Reads a Shared-memory entry: the latest version when `version` is
    /// `None`, or the specified historical version.
    #[must_use]
    pub fn read_shared(&self, key: &str, version: Option<u64>) -> Option<&SharedEntry> {
        match version {
            None => self.shared.get(key),
            Some(version) => {
                if self.shared.get(key).is_some_and(|entry| entry.version == version) {
                    return self.shared.get(key);
                }
                self.shared_history.get(key)?.iter().find(|entry| entry.version == version)
            },
        }
    }

    // -- Semantic tier ------------------------------------------------------

    /// Adds a new pattern, subject to the Write Gate.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::Denied`] when the Write Gate rejects the
    /// write.
    #[allow(clippy::too_many_arguments, reason = "mirrors the literal PatternRecord shape in spec.md §3")]
    pub fn add_pattern(
        &mut self,
        id: PatternId,
        pattern_type: impl Into<String>,
        trigger_signature: impl Into<String>,
        recommended_action: impl Into<String>,
        confidence: f64,
        evidence_ids: Vec<EventId>,
        created_at: Timestamp,
        signals: &WriteSignals,
    ) -> Result<PatternId, MemoryBusError> {
        evaluate_semantic_write(signals, &self.config).map_err(MemoryBusError::Denied)?;
        let pattern = PatternRecord {
            id: id.clone(),
            pattern_type: pattern_type.into(),
            trigger_signature: trigger_signature.into(),
            recommended_action: recommended_action.into(),
            confidence,
            evidence_ids,
            created_at,
            last_strengthened_at: None,
        };
        self.semantic.insert(id.clone(), pattern);
        Ok(id)
    }

    /// Reads a pattern record.
    #[must_use]
    pub fn read_pattern(&self, id: &PatternId) -> Option<&PatternRecord> {
        self.semantic.get(id)
    }

    /// Strengthens a pattern's confidence by `+0.05`, clamped to `1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::PatternNotFound`] when `id` is unknown.
    pub fn strengthen_pattern(
        &mut self,
        id: &PatternId,
        evidence_id: EventId,
        at: Timestamp,
    ) -> Result<&PatternRecord, MemoryBusError> {
        let pattern = self.semantic.get_mut(id).ok_or_else(|| MemoryBusError::PatternNotFound(id.clone()))?;
        pattern.strengthen(evidence_id, at);
        Ok(&*pattern)
    }

    /// Weakens a pattern's confidence by `-0.1`, clamped to `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryBusError::PatternNotFound`] when `id` is unknown.
    pub fn weaken_pattern(&mut self, id: &PatternId) -> Result<&PatternRecord, MemoryBusError> {
        let pattern = self.semantic.get_mut(id).ok_or_else(|| MemoryBusError::PatternNotFound(id.clone()))?;
        pattern.weaken();
        Ok(&*pattern)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use serde_json::json;

    use super::*;

    fn good_signals() -> WriteSignals {
        WriteSignals {
            progress_delta: 0.1,
            conflict_level: ConflictLevel::None,
            source_quality: 0.8,
            alignment_score: 0.8,
            blast_radius: BlastRadius::Local,
        }
    }

    #[test]
    fn working_entry_is_hidden_and_swept_once_expired() {
        let mut bus = MemoryBus::new(WriteGateConfig::default());
        let problem_id = ProblemId::new("problem-1");
        bus.write_working(WorkingEntry {
            problem_id: problem_id.clone(),
            key: "k".to_string(),
            value: json!("v"),
            expires_at: Timestamp::Logical(10),
        });
        assert!(bus.read_working(&problem_id, "k", Timestamp::Logical(5)).is_some());
        assert!(bus.read_working(&problem_id, "k", Timestamp::Logical(10)).is_none());
        assert_eq!(bus.evict_expired_working(Timestamp::Logical(10)), 1);
        assert!(bus.read_working(&problem_id, "k", Timestamp::Logical(5)).is_none());
    }

    #[test]
    fn shared_write_denied_below_quality_threshold() {
        let mut bus = MemoryBus::new(WriteGateConfig::default());
        let signals = WriteSignals {
            source_quality: 0.1,
            ..good_signals()
        };
        let result = bus.write_shared("k", json!(1), None, &signals, Timestamp::Logical(1));
        assert!(result.is_err());
    }

    #[test]
    fn shared_write_increments_version_and_retains_history() {
        let mut bus = MemoryBus::new(WriteGateConfig::default());
        bus.write_shared("k", json!(1), None, &good_signals(), Timestamp::Logical(1)).expect("first write");
        bus.write_shared("k", json!(2), Some(1), &good_signals(), Timestamp::Logical(2)).expect("second write");
        let latest = bus.read_shared("k", None).expect("latest");
        assert_eq!(latest.version, 2);
        let first = bus.read_shared("k", Some(1)).expect("first version");
        assert_eq!(first.value, json!(1));
    }

    #[test]
    fn shared_write_rejects_stale_expected_version() {
        let mut bus = MemoryBus::new(WriteGateConfig::default());
        bus.write_shared("k", json!(1), None, &good_signals(), Timestamp::Logical(1)).expect("first write");
        let result = bus.write_shared("k", json!(2), Some(99), &good_signals(), Timestamp::Logical(2));
        assert!(matches!(result, Err(MemoryBusError::VersionConflict { .. })));
    }

    #[test]
    fn semantic_write_denied_on_conflict() {
        let mut bus = MemoryBus::new(WriteGateConfig::default());
        let signals = WriteSignals {
            conflict_level: ConflictLevel::Medium,
            ..good_signals()
        };
        let result = bus.add_pattern(
            PatternId::new("p1"),
            "retry_storm",
            "tool=fs.read_file status=timeout",
            "back off",
            0.6,
            vec![],
            Timestamp::Logical(1),
            &signals,
        );
        assert!(result.is_err());
    }

    #[test]
    fn strengthen_and_weaken_adjust_confidence() {
        let mut bus = MemoryBus::new(WriteGateConfig::default());
        bus.add_pattern(
            PatternId::new("p1"),
            "retry_storm",
            "tool=fs.read_file status=timeout",
            "back off",
            0.5,
            vec![],
            Timestamp::Logical(1),
            &good_signals(),
        )
        .expect("add pattern");
        bus.strengthen_pattern(&PatternId::new("p1"), EventId::new("e1"), Timestamp::Logical(2)).expect("strengthen");
        let pattern = bus.read_pattern(&PatternId::new("p1")).expect("pattern");
        assert!((pattern.confidence - 0.55).abs() < 1e-9);
        bus.weaken_pattern(&PatternId::new("p1")).expect("weaken");
        let pattern = bus.read_pattern(&PatternId::new("p1")).expect("pattern");
        assert!((pattern.confidence - 0.45).abs() < 1e-9);
    }
}

// agent-kernel-core/src/core/time.rs
// ============================================================================
// Module: Agent Kernel Time Model
// Description: Canonical timestamp representation for episodic records.
// Purpose: Provide deterministic, replayable time values across the kernel.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The kernel never reads wall-clock time directly; hosts supply timestamps
//! explicitly when they append trace events or evaluate triggers, keeping
//! turn replay deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in episodic records and audit events.
///
/// # Invariants
/// - Values are explicitly provided by callers; the kernel never reads
///   wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value (used in deterministic replay tests).
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }
}

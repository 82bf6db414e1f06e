// agent-kernel-core/src/core/stance.rs
// ============================================================================
// Module: Agent Kernel Stance
// Description: The four authority modes governing what the kernel permits.
// Purpose: Define the Stance type owned exclusively by the Stance Machine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Exactly one stance is current at any time. It is created at
//! `Sensemaking` and mutated only by the runtime's Stance Machine through
//! gated transitions; this type itself carries no mutation logic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Stance
// ============================================================================

/// The kernel's current authority mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Exploring the problem space without committing to action.
    Sensemaking,
    /// Actively investigating options before a commitment is made.
    Discovery,
    /// Executing against an active commitment.
    Execution,
    /// Evaluating progress against success criteria.
    Evaluation,
}

impl Default for Stance {
    fn default() -> Self {
        Self::Sensemaking
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sensemaking => "sensemaking",
            Self::Discovery => "discovery",
            Self::Execution => "execution",
            Self::Evaluation => "evaluation",
        };
        f.write_str(label)
    }
}

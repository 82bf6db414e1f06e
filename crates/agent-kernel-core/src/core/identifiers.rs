// agent-kernel-core/src/core/identifiers.rs
// ============================================================================
// Module: Agent Kernel Identifiers
// Description: Canonical opaque identifiers used across the governance kernel.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the opaque string-based identifiers threaded through
//! proposals, packets, lanes, leases, and the episodic trace. Identifiers
//! carry no semantics of their own; validation happens at the boundary that
//! constructs them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Declares a newtype string identifier with the kernel's standard surface.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id!(
    /// Identifier for an isolated problem/workstream scope used by Working memory.
    ProblemId
);

string_id!(
    /// Identifier for a driver session spanning many turns.
    SessionId
);

string_id!(
    /// Identifier for an agent definition or a running agent instance.
    AgentId
);

string_id!(
    /// Identifier for a declared tool contract.
    ToolId
);

string_id!(
    /// Identifier for a lane (workstream).
    LaneId
);

string_id!(
    /// Identifier for a buffered proposal.
    ProposalId
);

string_id!(
    /// Identifier for an episodic trace event.
    EventId
);

string_id!(
    /// Identifier for a semantic-tier pattern record.
    PatternId
);

string_id!(
    /// Identifier for a tool invocation request, used for deterministic batch ordering.
    RequestId
);

string_id!(
    /// Identifier for a capability recognized by the delegation manager.
    CapabilityId
);

string_id!(
    /// Identifier for an audit event.
    AuditId
);

string_id!(
    /// Name of a gate as requested by an agent packet (e.g. `"framing"`,
    /// or a protected name like `"stance_override"`). Distinct from
    /// [`crate::core::gate::GateKind`], which is the kernel's own closed
    /// enum of gate checkpoints; agents speak in loose strings that the
    /// firewall and gate controller must map or reject.
    GateRequestName
);

/// Monotonic turn counter; the unit of scheduling and cooldown accounting.
pub type TurnId = u64;

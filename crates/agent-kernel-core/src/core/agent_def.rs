// agent-kernel-core/src/core/agent_def.rs
// ============================================================================
// Module: Agent Kernel Agent Definitions
// Description: Static declarations of delegable agents.
// Purpose: Define AgentDefinition and its declarative prompt profile.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! An agent definition is declarative configuration, not a running process.
//! The Packet Firewall consults `allowed_tool_requests`/`allowed_gate_requests`
//! to sanitize a packet; the Delegation Manager consults `requested_scopes`
//! when a capability lease is granted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::CapabilityId;
use crate::core::identifiers::GateRequestName;
use crate::core::identifiers::ToolId;

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// How long an agent instance persists once invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Invoked once for a single turn, then discarded.
    Ephemeral,
    /// Persists across turns within a session.
    Session,
}

// ============================================================================
// SECTION: Prompt Profile
// ============================================================================

/// Declarative shape of an agent's prompt, not its literal text.
///
/// spec.md §1 explicitly keeps prompt wording out of scope; only its
/// precedence-relevant shape is modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptProfile {
    /// Requested writing style (e.g. "concise", "analytical").
    pub style: String,
    /// Requested tone (e.g. "neutral", "direct").
    pub tone: String,
    /// Maximum words the agent's message should contain; must be `>= 50`.
    pub max_words: u32,
}

impl PromptProfile {
    /// Returns true when `max_words` satisfies the minimum of 50.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.max_words >= 50
    }
}

// ============================================================================
// SECTION: Agent Definition
// ============================================================================

/// A declarative definition of a delegable agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique agent identifier.
    pub agent_id: AgentId,
    /// Definition version, for compatibility checks across sessions.
    pub version: String,
    /// Functional role (e.g. "writer", "analyst").
    pub role: String,
    /// Instance lifecycle.
    pub lifecycle: Lifecycle,
    /// Routing tags used to select this agent for a given lane or task.
    pub routing_tags: BTreeSet<String>,
    /// Declarative prompt shape.
    pub prompt_profile: PromptProfile,
    /// Capability scopes this agent may be delegated.
    pub requested_scopes: BTreeSet<CapabilityId>,
    /// Tools this agent's packets may request.
    pub allowed_tool_requests: BTreeSet<ToolId>,
    /// Gate names this agent's packets may request.
    pub allowed_gate_requests: BTreeSet<GateRequestName>,
}

impl AgentDefinition {
    /// Returns true when `tool` is in this agent's allowed tool-request set.
    #[must_use]
    pub fn permits_tool(&self, tool: &ToolId) -> bool {
        self.allowed_tool_requests.contains(tool)
    }

    /// Returns true when `gate` is in this agent's allowed gate-request set.
    #[must_use]
    pub fn permits_gate_request(&self, gate: &GateRequestName) -> bool {
        self.allowed_gate_requests.contains(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AgentDefinition {
        AgentDefinition {
            agent_id: AgentId::new("researcher"),
            version: "1.0.0".to_string(),
            role: "analyst".to_string(),
            lifecycle: Lifecycle::Ephemeral,
            routing_tags: BTreeSet::new(),
            prompt_profile: PromptProfile {
                style: "concise".to_string(),
                tone: "neutral".to_string(),
                max_words: 200,
            },
            requested_scopes: BTreeSet::new(),
            allowed_tool_requests: BTreeSet::from([ToolId::new("fs.read_file")]),
            allowed_gate_requests: BTreeSet::new(),
        }
    }

    #[test]
    fn permits_tool_checks_allowlist_membership() {
        let def = sample();
        assert!(def.permits_tool(&ToolId::new("fs.read_file")));
        assert!(!def.permits_tool(&ToolId::new("fs.write_file")));
    }

    #[test]
    fn prompt_profile_rejects_max_words_below_fifty() {
        let mut profile = sample().prompt_profile;
        profile.max_words = 10;
        assert!(!profile.is_valid());
    }
}

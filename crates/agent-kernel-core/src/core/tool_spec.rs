// agent-kernel-core/src/core/tool_spec.rs
// ============================================================================
// Module: Agent Kernel Tool Specifications
// Description: Static declarations of tools the Tool Runtime may invoke.
// Purpose: Define ToolSpec and its side-effect classification.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! A tool spec declares shape and side-effect class, not implementation; the
//! Tool Runtime dispatches to a connector, named by `connector`, that does
//! the actual work. `requires_approval` is derived, never stored, so it can
//! never drift from `side_effect`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CapabilityId;
use crate::core::identifiers::ToolId;

// ============================================================================
// SECTION: Side Effect Class
// ============================================================================

/// Declares what kind of effect invoking a tool can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectClass {
    /// No effect of any kind (pure computation).
    None,
    /// Reads state but never mutates it.
    Read,
    /// Mutates state reachable from the kernel (e.g. the filesystem).
    Write,
    /// Performs network I/O.
    Network,
    /// Affects state external to the kernel's own sandbox.
    External,
}

// ============================================================================
// SECTION: Tool Spec
// ============================================================================

/// A declarative description of an invocable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool identifier (e.g. `"fs.write_file"`).
    pub id: ToolId,
    /// Spec version, for compatibility checks.
    pub version: String,
    /// Side-effect classification.
    pub side_effect: SideEffectClass,
    /// Capability scopes a caller must hold to invoke this tool.
    pub required_scopes: BTreeSet<CapabilityId>,
    /// Name of the connector this tool dispatches through.
    pub connector: String,
    /// JSON Schema describing accepted arguments.
    pub input_schema: Value,
    /// JSON Schema describing the tool's return value.
    pub output_schema: Value,
    /// Human-readable description.
    pub description: String,
}

impl ToolSpec {
    /// Returns true iff `side_effect` is [`SideEffectClass::Write`] or
    /// [`SideEffectClass::External`], per spec.md §3's derivation rule.
    #[must_use]
    pub const fn requires_approval(&self) -> bool {
        matches!(self.side_effect, SideEffectClass::Write | SideEffectClass::External)
    }

    /// Returns the connector operation name: the last `.`-separated segment
    /// of the tool id (e.g. `fs.read_file` → `read_file`), per spec.md
    /// §4.7 step 5.
    #[must_use]
    pub fn connector_operation(&self) -> &str {
        self.id.as_str().rsplit('.').next().unwrap_or(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(side_effect: SideEffectClass) -> ToolSpec {
        ToolSpec {
            id: ToolId::new("fs.write_file"),
            version: "1.0.0".to_string(),
            side_effect,
            required_scopes: BTreeSet::new(),
            connector: "local_fs".to_string(),
            input_schema: Value::Null,
            output_schema: Value::Null,
            description: "writes a file".to_string(),
        }
    }

    #[test]
    fn write_and_external_require_approval() {
        assert!(spec(SideEffectClass::Write).requires_approval());
        assert!(spec(SideEffectClass::External).requires_approval());
    }

    #[test]
    fn read_and_none_and_network_do_not_require_approval() {
        assert!(!spec(SideEffectClass::Read).requires_approval());
        assert!(!spec(SideEffectClass::None).requires_approval());
        assert!(!spec(SideEffectClass::Network).requires_approval());
    }

    #[test]
    fn connector_operation_strips_namespace_prefix() {
        assert_eq!(spec(SideEffectClass::Write).connector_operation(), "write_file");
    }
}

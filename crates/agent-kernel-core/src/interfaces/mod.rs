// agent-kernel-core/src/interfaces/mod.rs
// ============================================================================
// Module: Agent Kernel Interfaces
// Description: Backend-agnostic ports implemented by host-specific crates.
// Purpose: Define the trait surfaces the runtime depends on, never the
// concrete implementations.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the kernel integrates with language models, tool
//! backends, and persistence without embedding backend-specific details.
//! Implementations must fail closed: an error from any port is treated as
//! "cannot proceed," never as an implicit allow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::AgentDefinition;
use crate::core::AgentId;
use crate::core::AgentPacket;
use crate::core::AuditEvent;
use crate::core::Event;
use crate::core::ToolId;
use crate::core::ToolSpec;

// ============================================================================
// SECTION: LLM Port
// ============================================================================

/// Context supplied to a language-model invocation.
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Agent being invoked.
    pub agent_id: AgentId,
    /// Fully rendered prompt, including instructions and visible memory.
    pub prompt: String,
    /// Declared tools available to this invocation.
    pub available_tools: Vec<ToolSpec>,
}

/// Errors raised by an [`LlmPort`] implementation.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The backend returned a response that does not parse as an
    /// [`AgentPacket`].
    #[error("malformed agent packet: {0}")]
    MalformedPacket(String),
    /// The backend call itself failed.
    #[error("llm backend error: {0}")]
    Backend(String),
    /// The backend did not respond within its allotted time.
    #[error("llm invocation timed out after {0}ms")]
    Timeout(u64),
}

/// Backend-agnostic language-model invocation port.
///
/// Implementations must be deterministic given identical inputs wherever the
/// backend allows it, and must never mutate kernel state directly; any
/// requested action travels back as part of the returned [`AgentPacket`] for
/// the Packet Firewall to evaluate.
pub trait LlmPort {
    /// Invokes the model and parses its response into a structured packet.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the backend fails or returns an unparsable
    /// response.
    fn invoke(&self, request: &LlmInvocation) -> Result<AgentPacket, LlmError>;
}

// ============================================================================
// SECTION: Connector
// ============================================================================

/// Errors raised by a [`Connector`] implementation.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The requested tool is not recognized by this connector.
    #[error("unknown tool: {0}")]
    UnknownTool(ToolId),
    /// The supplied arguments did not match the tool's declared schema.
    #[error("invalid arguments for tool {tool}: {detail}")]
    InvalidArgs {
        /// Tool the arguments were rejected for.
        tool: ToolId,
        /// Validation failure detail.
        detail: String,
    },
    /// The connector refused the call for sandboxing reasons (for example,
    /// a path escaping its sandbox root).
    #[error("sandbox violation: {0}")]
    SandboxViolation(String),
    /// The underlying backend call failed.
    #[error("connector backend error: {0}")]
    Backend(String),
    /// The call exceeded its declared timeout.
    #[error("tool invocation timed out after {0}ms")]
    Timeout(u64),
}

/// Backend-agnostic tool dispatch port used by the Tool Runtime.
///
/// A connector is never consulted for whether a call is *authorized*; by the
/// time the Tool Runtime reaches a connector, the Policy Decision Point has
/// already approved the call. A connector only decides whether it *can*
/// perform the call.
pub trait Connector {
    /// Declares the tools this connector can dispatch.
    fn declared_tools(&self) -> Vec<ToolSpec>;

    /// Invokes a tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError`] when the tool is unknown, the arguments are
    /// invalid, the call is out of sandbox, or the backend fails.
    fn invoke(&self, tool_id: &ToolId, args: &Value) -> Result<Value, ConnectorError>;
}

// ============================================================================
// SECTION: Persistence Sink
// ============================================================================

/// Errors raised by a [`PersistenceSink`] implementation.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// An I/O failure occurred while reading or writing.
    #[error("persistence io error: {0}")]
    Io(String),
    /// Stored data failed to (de)serialize.
    #[error("persistence serialization error: {0}")]
    Serialization(String),
    /// Stored data failed an integrity check (for example, a broken audit
    /// hash chain).
    #[error("persistence integrity error: {0}")]
    Integrity(String),
}

/// Backend-agnostic append-only sink for episodic events and audit records.
///
/// Implementations must preserve append order; the Episodic Trace and audit
/// chain both depend on never reordering or dropping a record once it is
/// acknowledged.
pub trait PersistenceSink {
    /// Appends a single episodic event.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the event cannot be durably
    /// recorded.
    fn append_event(&mut self, event: &Event) -> Result<(), PersistenceError>;

    /// Appends a single audit record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the record cannot be durably
    /// recorded.
    fn append_audit(&mut self, event: &AuditEvent) -> Result<(), PersistenceError>;
}

// ============================================================================
// SECTION: Agent Registry
// ============================================================================

/// Errors raised by an [`AgentRegistry`] implementation.
#[derive(Debug, Error)]
pub enum AgentRegistryError {
    /// No definition is registered for the requested agent id.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),
}

/// Source of truth for declared agent definitions, consulted by the
/// Delegation Manager before granting a lease.
pub trait AgentRegistry {
    /// Looks up a single agent definition.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError`] when no such agent is registered.
    fn get(&self, agent_id: &AgentId) -> Result<AgentDefinition, AgentRegistryError>;

    /// Lists every registered agent definition.
    fn list(&self) -> Vec<AgentDefinition>;
}

// agent-kernel-core/src/core/mod.rs
// ============================================================================
// Module: Agent Kernel Core Data Model
// Description: Pure data types shared across every runtime component.
// Purpose: Re-export the governance kernel's types with no mutation logic
// attached; mutation lives in agent-kernel-runtime.
// ============================================================================

//! ## Overview
//! Everything under `core` is inert: structs and enums with constructors and
//! read-only accessors, never a component that decides anything. Decisions
//! belong to the runtime crate.

pub mod agent_def;
pub mod audit;
pub mod commitment;
pub mod delegation;
pub mod event;
pub mod gate;
pub mod hashing;
pub mod identifiers;
pub mod lane;
pub mod memory;
pub mod packet;
pub mod proposal;
pub mod stance;
pub mod time;
pub mod tool_spec;

pub use agent_def::AgentDefinition;
pub use agent_def::Lifecycle;
pub use agent_def::PromptProfile;
pub use audit::AuditDecision;
pub use audit::AuditEvent;
pub use commitment::CommitmentLease;
pub use commitment::Horizon;
pub use delegation::DelegationLease;
pub use event::Event;
pub use gate::GateKind;
pub use gate::GateResult;
pub use gate::default_protected_gate_requests;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::AgentId;
pub use identifiers::AuditId;
pub use identifiers::CapabilityId;
pub use identifiers::EventId;
pub use identifiers::GateRequestName;
pub use identifiers::LaneId;
pub use identifiers::PatternId;
pub use identifiers::ProblemId;
pub use identifiers::ProposalId;
pub use identifiers::RequestId;
pub use identifiers::SessionId;
pub use identifiers::ToolId;
pub use identifiers::TurnId;
pub use lane::Lane;
pub use lane::LaneBudgets;
pub use lane::LaneLease;
pub use lane::LaneSnapshot;
pub use lane::LaneStatus;
pub use lane::LeaseMode;
pub use memory::BlastRadius;
pub use memory::ConflictLevel;
pub use memory::MemoryTier;
pub use memory::PatternRecord;
pub use memory::SharedEntry;
pub use memory::WorkingEntry;
pub use memory::WriteSignals;
pub use packet::AgentPacket;
pub use proposal::LaneActionKind;
pub use proposal::Proposal;
pub use proposal::ProposalKind;
pub use proposal::ProposalSource;
pub use proposal::Severity;
pub use stance::Stance;
pub use time::Timestamp;
pub use tool_spec::SideEffectClass;
pub use tool_spec::ToolSpec;

// agent-kernel-runtime/src/lib.rs
// ============================================================================
// Module: Agent Kernel Runtime Library
// Description: Public API surface for the governance kernel's decision
// logic.
// Purpose: Expose every authoritative component defined in spec.md §4 and
// the turn driver that composes them.
// Dependencies: crate::runtime, agent_kernel_core
// ============================================================================

//! ## Overview
//! `agent-kernel-runtime` owns every piece of mutation logic the data model
//! in `agent-kernel-core` describes but does not itself perform: the stance
//! machine, commitment manager, gate controller, proposal buffer, packet
//! firewall, policy decision point, tool runtime, memory bus and write gate,
//! lane store, delegation manager, orchestrator, and episodic trace. The
//! [`runtime::turn_driver`] module composes all of them into a single turn
//! loop; embedders may also use each component individually.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use runtime::commitment_manager::CommitmentError;
pub use runtime::commitment_manager::CommitmentManager;
pub use runtime::delegation_manager::DelegationError;
pub use runtime::delegation_manager::DelegationManager;
pub use runtime::delegation_manager::DelegationSummary;
pub use runtime::episodic_trace::EpisodicTrace;
pub use runtime::episodic_trace::TraceError;
pub use runtime::firewall::FirewallConfig;
pub use runtime::firewall::FirewallResult;
pub use runtime::firewall::FirewallViolation;
pub use runtime::firewall::PacketFirewall;
pub use runtime::firewall::ViolationSeverity;
pub use runtime::gate_controller::CommitmentRequest;
pub use runtime::gate_controller::GateController;
pub use runtime::gate_controller::GateControllerConfig;
pub use runtime::gate_controller::default_priority_order;
pub use runtime::lane_store::LaneStore;
pub use runtime::lane_store::LaneStoreConfig;
pub use runtime::lane_store::LaneStoreError;
pub use runtime::memory_bus::MemoryBus;
pub use runtime::memory_bus::MemoryBusError;
pub use runtime::memory_bus::WriteGateConfig;
pub use runtime::orchestrator::AgentOutput;
pub use runtime::orchestrator::Orchestrator;
pub use runtime::orchestrator::OrchestratorConfig;
pub use runtime::orchestrator::OrchestratorError;
pub use runtime::orchestrator::OrchestratorResult;
pub use runtime::orchestrator::Reducer;
pub use runtime::pdp::Obligation;
pub use runtime::pdp::PolicyContext;
pub use runtime::pdp::PolicyDecision;
pub use runtime::pdp::ToolInvocationRequest;
pub use runtime::pdp::evaluate;
pub use runtime::pdp::evaluate_batch;
pub use runtime::proposal_buffer::ProposalBuffer;
pub use runtime::stance_machine::StanceError;
pub use runtime::stance_machine::StanceMachine;
pub use runtime::tool_runtime::ToolResult;
pub use runtime::tool_runtime::ToolRuntime;
pub use runtime::tool_runtime::ToolRuntimeError;
pub use runtime::turn_driver::TurnDriver;
pub use runtime::turn_driver::TurnOutcome;
pub use runtime::turn_driver::TurnDriverConfig;

// agent-kernel-runtime/src/runtime/turn_driver.rs
// ============================================================================
// Module: Turn Driver
// Description: Composes every kernel component into the sequential
// single-turn loop.
// Purpose: Implement the sense -> agents -> firewall -> reduce -> arbiter ->
// gate -> tools -> persist phase sequence from spec.md §5.
// Dependencies: crate::runtime::{episodic_trace, memory_bus, lane_store,
// delegation_manager, gate_controller, firewall, pdp, tool_runtime,
// orchestrator}
// ============================================================================

//! ## Overview
//! The Turn Driver is the only thing an embedder constructs directly. It
//! owns every authoritative component and runs them in the fixed phase
//! order spec.md §5 requires: one turn executes to completion, sequentially,
//! before the next begins. The only parallelism inside a turn happens inside
//! [`Orchestrator::execute`], during the agents phase.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use agent_kernel_core::AgentDefinition;
use agent_kernel_core::AgentId;
use agent_kernel_core::GateRequestName;
use agent_kernel_core::GateResult;
use agent_kernel_core::Proposal;
use agent_kernel_core::ProposalId;
use agent_kernel_core::ProposalKind;
use agent_kernel_core::ProposalSource;
use agent_kernel_core::Severity;
use agent_kernel_core::Timestamp;
use agent_kernel_core::TurnId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::runtime::delegation_manager::DelegationManager;
use crate::runtime::episodic_trace::EpisodicTrace;
use crate::runtime::episodic_trace::TraceError;
use crate::runtime::firewall::FirewallViolation;
use crate::runtime::firewall::PacketFirewall;
use crate::runtime::gate_controller::GateController;
use crate::runtime::gate_controller::default_priority_order;
use crate::runtime::lane_store::LaneStore;
use crate::runtime::memory_bus::MemoryBus;
use crate::runtime::orchestrator::AgentContext;
use crate::runtime::orchestrator::Orchestrator;
use crate::runtime::orchestrator::OrchestratorError;
use crate::runtime::orchestrator::Reducer;
use crate::runtime::pdp::PolicyContext;
use crate::runtime::pdp::ToolInvocationRequest;
use crate::runtime::proposal_buffer::ProposalBuffer;
use crate::runtime::tool_runtime::ToolResult;
use crate::runtime::tool_runtime::ToolRuntime;
use crate::runtime::tool_runtime::ToolRuntimeContext;
use crate::runtime::tool_runtime::ToolRuntimeError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while running a single turn.
#[derive(Debug, Error)]
pub enum TurnDriverError {
    /// The agents phase failed (timeout, agent violation, or panel budget
    /// exceeded). Per spec.md §4.11, a validation failure is not recoverable
    /// for the turn.
    #[error("agents phase failed: {0}")]
    Orchestrator(#[from] OrchestratorError),
    /// The tools phase could not proceed (no connector registered for a
    /// requested tool's declared connector name).
    #[error("tools phase failed: {0}")]
    ToolRuntime(#[from] ToolRuntimeError),
    /// The persist phase failed to durably record an episodic event.
    #[error("persist phase failed: {0}")]
    Trace(#[from] TraceError),
}

// ============================================================================
// SECTION: Turn Driver Config
// ============================================================================

/// Tunable knobs for the turn loop itself, distinct from each component's
/// own config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDriverConfig {
    /// Order gate-request proposal sources are processed in, per spec.md
    /// §4.3 rule 2.
    #[serde(default = "default_priority_order")]
    pub priority_order: Vec<ProposalSource>,
    /// Whether the agents phase invokes its panel concurrently.
    #[serde(default)]
    pub parallel_agents: bool,
}

impl Default for TurnDriverConfig {
    fn default() -> Self {
        Self {
            priority_order: default_priority_order(),
            parallel_agents: false,
        }
    }
}

// ============================================================================
// SECTION: Turn Outcome
// ============================================================================

/// The result of running one complete turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// The turn that was just executed.
    pub turn: TurnId,
    /// The agents phase's reduced message.
    pub message: String,
    /// Every gate attempt made during the arbiter/gate phase.
    pub gate_results: Vec<GateResult>,
    /// Every tool invocation and its audit record from the tools phase.
    pub tool_results: Vec<(ToolResult, agent_kernel_core::AuditEvent)>,
    /// Firewall violations found across every agent output this turn
    /// (warnings and the errors that caused a packet's proposals to be
    /// dropped).
    pub firewall_violations: Vec<FirewallViolation>,
}

// ============================================================================
// SECTION: Turn Driver
// ============================================================================

/// Composes every authoritative component into the single-turn loop.
pub struct TurnDriver {
    /// Append-only audit record.
    trace: EpisodicTrace,
    /// The four memory tiers.
    memory: MemoryBus,
    /// Workstream tracking.
    lanes: LaneStore,
    /// Capability leases.
    delegation: DelegationManager,
    /// Stance/commitment arbiter.
    gate: GateController,
    /// Boundary guard between advisory agents and authoritative core.
    firewall: PacketFirewall,
    /// Policy enforcement point and connector dispatcher.
    tool_runtime: ToolRuntime,
    /// MapReduce fan-out over agent invocations.
    orchestrator: Orchestrator,
    /// Turn-loop-level tunables.
    config: TurnDriverConfig,
    /// Monotonic turn counter, incremented once per completed turn.
    current_turn: TurnId,
}

impl TurnDriver {
    /// Composes a turn driver from its already-constructed components.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "composes every top-level kernel component exactly once, per spec.md §2")]
    pub fn new(
        trace: EpisodicTrace,
        memory: MemoryBus,
        lanes: LaneStore,
        delegation: DelegationManager,
        gate: GateController,
        firewall: PacketFirewall,
        tool_runtime: ToolRuntime,
        orchestrator: Orchestrator,
        config: TurnDriverConfig,
    ) -> Self {
        Self {
            trace,
            memory,
            lanes,
            delegation,
            gate,
            firewall,
            tool_runtime,
            orchestrator,
            config,
            current_turn: 1,
        }
    }

    /// Returns the turn number that will be executed next.
    #[must_use]
    pub const fn current_turn(&self) -> TurnId {
        self.current_turn
    }

    /// Returns the Episodic Trace.
    #[must_use]
    pub const fn trace(&self) -> &EpisodicTrace {
        &self.trace
    }

    /// Returns the Memory Bus.
    #[must_use]
    pub const fn memory(&self) -> &MemoryBus {
        &self.memory
    }

    /// Returns a mutable handle to the Memory Bus, for direct reads/writes
    /// outside the turn loop (e.g. seeding Working memory before the first
    /// turn).
    pub const fn memory_mut(&mut self) -> &mut MemoryBus {
        &mut self.memory
    }

    /// Returns the Lane Store.
    #[must_use]
    pub const fn lanes(&self) -> &LaneStore {
        &self.lanes
    }

    /// Returns a mutable handle to the Lane Store.
    pub const fn lanes_mut(&mut self) -> &mut LaneStore {
        &mut self.lanes
    }

    /// Returns the Delegation Manager.
    #[must_use]
    pub const fn delegation(&self) -> &DelegationManager {
        &self.delegation
    }

    /// Returns a mutable handle to the Delegation Manager.
    pub const fn delegation_mut(&mut self) -> &mut DelegationManager {
        &mut self.delegation
    }

    /// Returns the Gate Controller.
    #[must_use]
    pub const fn gate(&self) -> &GateController {
        &self.gate
    }

    /// Runs one complete turn: sense, agents, firewall, reduce, arbiter,
    /// gate, tools, persist, in that order. `policy` carries the turn's
    /// budget state across tool invocations and is updated in place.
    ///
    /// # Errors
    ///
    /// Returns [`TurnDriverError::Orchestrator`] when the agents phase
    /// fails, [`TurnDriverError::ToolRuntime`] when the tools phase cannot
    /// proceed, or [`TurnDriverError::Trace`] when the persist phase fails
    /// to durably record an episodic event.
    pub fn run_turn(
        &mut self,
        agents: &[AgentId],
        definitions: &BTreeMap<AgentId, AgentDefinition>,
        reducer: &Reducer,
        agent_context: &AgentContext,
        policy: &mut PolicyContext,
        at: Timestamp,
    ) -> Result<TurnOutcome, TurnDriverError> {
        let turn = self.current_turn;
        let mut buffer = ProposalBuffer::new();

        // -- sense --------------------------------------------------------
        if !self.lanes.check_expired_leases(at).is_empty() {
            buffer.add(Proposal::new(
                ProposalId::new(format!("lease-expiry-{turn}")),
                ProposalKind::GateRequest {
                    gate: GateRequestName::new("evaluation"),
                    reason: "a lane lease expired".to_string(),
                    severity: Severity::Medium,
                },
                ProposalSource::CommitmentExpiry,
            ));
        }
        if let Some(proposal) = self.gate.commitment_check_expiry(ProposalId::new(format!("commitment-expiry-{turn}")))
        {
            buffer.add(proposal);
        }
        self.memory.evict_expired_working(at);

        // -- agents ---------------------------------------------------------
        let orchestrator_result = self.orchestrator.execute(agents, reducer, agent_context, self.config.parallel_agents)?;

        // -- firewall / reduce ----------------------------------------------
        let mut violations = Vec::new();
        for output in &orchestrator_result.agent_outputs {
            let Some(packet) = &output.packet else {
                continue;
            };
            let definition = definitions.get(&output.agent_id);
            let firewall_result = self.firewall.validate(packet, definition);
            violations.extend(firewall_result.violations.clone());
            if let Some(sanitized) = firewall_result.sanitized_packet {
                for proposal in sanitized.proposals {
                    buffer.add(proposal);
                }
            }
        }

        // -- arbiter / gate ---------------------------------------------------
        let gate_results = self.gate.process_proposals(&buffer, &self.config.priority_order, turn, at);

        // -- tools ------------------------------------------------------------
        let mut tool_requests = Vec::new();
        for proposal in buffer.get_by_kind(|kind| matches!(kind, ProposalKind::ToolRequest { .. })) {
            if let ProposalKind::ToolRequest {
                tool_id,
                args,
            } = &proposal.kind
            {
                tool_requests.push(ToolInvocationRequest {
                    proposal_id: proposal.id.clone(),
                    tool_id: tool_id.clone(),
                    args: args.clone(),
                });
            }
        }
        let mut tool_context = ToolRuntimeContext {
            policy: policy.clone(),
            turn,
            lane_id: self.lanes.active_lane().map(|lane| lane.lane_id.clone()),
            agent_id: None,
        };
        let tool_results = self.tool_runtime.invoke_batch(&tool_requests, &mut tool_context, at)?;
        *policy = tool_context.policy;

        // -- persist ------------------------------------------------------------
        for gate_result in &gate_results {
            let mut payload = BTreeMap::new();
            payload.insert("gate".to_string(), json!(gate_result.gate.to_string()));
            payload.insert("approved".to_string(), json!(gate_result.approved));
            payload.insert("reason".to_string(), json!(gate_result.reason));
            self.trace.log("gate_attempt", payload, None, vec![], at)?;
        }
        for (result, audit) in &tool_results {
            let mut payload = BTreeMap::new();
            payload.insert("tool_id".to_string(), json!(audit.tool_id.as_str()));
            payload.insert("decision".to_string(), json!(result.ok));
            payload.insert("reason".to_string(), json!(audit.reason));
            self.trace.log("decision_recorded", payload, None, vec![], at)?;
        }

        self.gate.tick();
        self.gate.commitment_tick();
        self.delegation.tick();
        self.current_turn += 1;

        Ok(TurnOutcome {
            turn,
            message: orchestrator_result.content,
            gate_results,
            tool_results,
            firewall_violations: violations,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use agent_kernel_core::AgentPacket;
    use agent_kernel_core::GateRequestName;
    use agent_kernel_core::Lifecycle;
    use agent_kernel_core::ProposalId;
    use agent_kernel_core::ProposalSource;
    use agent_kernel_core::PromptProfile;
    use agent_kernel_core::ToolId;
    use agent_kernel_core::interfaces::LlmError;
    use agent_kernel_core::interfaces::LlmInvocation;
    use agent_kernel_core::interfaces::LlmPort;
    use serde_json::json;

    use super::*;
    use crate::runtime::firewall::FirewallConfig;
    use crate::runtime::gate_controller::GateControllerConfig;
    use crate::runtime::lane_store::LaneStoreConfig;
    use crate::runtime::memory_bus::WriteGateConfig;
    use crate::runtime::orchestrator::OrchestratorConfig;

    struct StubAgent;

    impl LlmPort for StubAgent {
        fn invoke(&self, request: &LlmInvocation) -> Result<AgentPacket, LlmError> {
            let mut traces = BTreeMap::new();
            traces.insert("agent_id".to_string(), json!(request.agent_id.as_str()));
            Ok(AgentPacket {
                message: "draft ready".to_string(),
                proposals: vec![Proposal::new(
                    ProposalId::new("p1"),
                    ProposalKind::GateRequest {
                        gate: GateRequestName::new("framing"),
                        reason: "widen scope".to_string(),
                        severity: Severity::Low,
                    },
                    ProposalSource::Agent,
                )],
                confidence: 0.8,
                traces,
            })
        }
    }

    fn driver() -> TurnDriver {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        orchestrator.register_agent(AgentId::new("writer"), Box::new(StubAgent));
        TurnDriver::new(
            EpisodicTrace::new(None),
            MemoryBus::new(WriteGateConfig::default()),
            LaneStore::new(LaneStoreConfig::default()),
            DelegationManager::new(),
            GateController::new(GateControllerConfig::default()),
            PacketFirewall::new(FirewallConfig::default(), &[]),
            ToolRuntime::new(),
            orchestrator,
            TurnDriverConfig::default(),
        )
    }

    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_id: AgentId::new("writer"),
            version: "1.0.0".to_string(),
            role: "writer".to_string(),
            lifecycle: Lifecycle::Session,
            routing_tags: BTreeSet::new(),
            prompt_profile: PromptProfile {
                style: "concise".to_string(),
                tone: "direct".to_string(),
                max_words: 100,
            },
            requested_scopes: BTreeSet::new(),
            allowed_tool_requests: BTreeSet::from([ToolId::new("fs.read_file")]),
            allowed_gate_requests: BTreeSet::from([GateRequestName::new("framing")]),
        }
    }

    #[test]
    fn run_turn_advances_stance_and_turn_counter() {
        let mut driver = driver();
        let mut definitions = BTreeMap::new();
        definitions.insert(AgentId::new("writer"), definition());
        let mut policy = PolicyContext::default();
        let outcome = driver
            .run_turn(
                &[AgentId::new("writer")],
                &definitions,
                &Reducer::PassThrough,
                &AgentContext {
                    prompt: "draft the summary".to_string(),
                    available_tools: vec![],
                },
                &mut policy,
                Timestamp::Logical(1),
            )
            .expect("run_turn");
        assert_eq!(outcome.turn, 1);
        assert_eq!(outcome.message, "draft ready");
        assert_eq!(outcome.gate_results.len(), 1);
        assert!(outcome.gate_results[0].approved);
        assert_eq!(driver.current_turn(), 2);
        assert!(!driver.trace().is_empty());
    }

    #[test]
    fn unauthorized_gate_request_is_dropped_by_firewall() {
        let mut driver = driver();
        let mut definitions = BTreeMap::new();
        let mut restricted = definition();
        restricted.allowed_gate_requests = BTreeSet::new();
        definitions.insert(AgentId::new("writer"), restricted);
        let mut policy = PolicyContext::default();
        let outcome = driver
            .run_turn(
                &[AgentId::new("writer")],
                &definitions,
                &Reducer::PassThrough,
                &AgentContext {
                    prompt: "draft the summary".to_string(),
                    available_tools: vec![],
                },
                &mut policy,
                Timestamp::Logical(1),
            )
            .expect("run_turn");
        assert!(outcome.gate_results.is_empty());
        assert!(outcome.firewall_violations.iter().any(|violation| violation.code == "UNAUTHORIZED_GATE"));
    }
}

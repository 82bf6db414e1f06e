// agent-kernel-runtime/src/runtime/orchestrator.rs
// ============================================================================
// Module: Orchestrator (MapReduce over agents)
// Description: Fans out agent invocations and reduces their outputs to a
// single result.
// Purpose: Implement execute(agents, reducer, context, parallel) per
// spec.md §4.11.
// Dependencies: agent_kernel_core::{AgentId, AgentPacket, Proposal,
// ToolSpec}, agent_kernel_core::interfaces::{LlmPort, LlmInvocation}
// ============================================================================

//! ## Overview
//! The Orchestrator is the only place intra-turn parallelism happens
//! (spec.md §5): its Map phase fans agent invocations out to a bounded
//! worker pool, Validate runs an inlined firewall check over each output,
//! and Reduce folds the validated outputs down to a single content string
//! with one of four strategies. Agents are always invoked in alphabetical
//! `agent_id` order so a merge's result does not depend on completion
//! order (spec.md §5 panel-orchestration guarantee).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use agent_kernel_core::AgentId;
use agent_kernel_core::AgentPacket;
use agent_kernel_core::Proposal;
use agent_kernel_core::ToolSpec;
use agent_kernel_core::interfaces::LlmInvocation;
use agent_kernel_core::interfaces::LlmPort;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Decision Patterns
// ============================================================================

/// Phrases that mark a packet as claiming to have already made a decision,
/// rather than merely advising one. Agents may only advise; see spec.md
/// §4.11 step 2.
const DECISION_PATTERNS: &[&str] =
    &["the decision is", "i have decided", "final decision:", "this is final", "i hereby approve"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The parallel Map phase's wall-clock timeout expired before every
    /// agent completed.
    #[error("agent timeout: {completed}/{total} agents completed")]
    AgentTimeout {
        /// Agents that completed before the timeout.
        completed: usize,
        /// Total agents requested.
        total: usize,
    },
    /// An agent output failed validation (invalid packet shape, or content
    /// claiming a decision it has no authority to make).
    #[error("agent violation: {0}")]
    AgentViolation(String),
    /// More agents were requested than `max_agents` permits.
    #[error("too many agents requested: {requested} > {max_agents}")]
    TooManyAgents {
        /// Number of agents requested.
        requested: usize,
        /// Configured ceiling.
        max_agents: usize,
    },
    /// A `Vote` reducer found no winner meeting its threshold and its
    /// tiebreaker is `escalate`.
    #[error("vote did not reach threshold and escalation was requested")]
    VoteEscalation,
}

// ============================================================================
// SECTION: Agent Context
// ============================================================================

/// Inputs shared by every agent invoked in a single `execute` call.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Prompt text common to every agent in this round.
    pub prompt: String,
    /// Tools declared available to the invoked agents.
    pub available_tools: Vec<ToolSpec>,
}

// ============================================================================
// SECTION: Agent Output
// ============================================================================

/// The result of invoking a single agent, successful or not.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    /// Agent this output came from.
    pub agent_id: AgentId,
    /// The produced packet, present only when the invocation succeeded.
    pub packet: Option<AgentPacket>,
    /// Error detail, present only when the invocation failed.
    pub error: Option<String>,
}

/// Returns true when `packet` satisfies the Orchestrator's own minimal
/// shape check: a non-empty `agent_id` trace and a non-empty message.
/// Distinct from the Packet Firewall's fuller validation elsewhere in the
/// turn.
fn is_valid_packet(packet: &AgentPacket) -> bool {
    packet.agent_id_trace().is_some_and(|id| !id.is_empty()) && !packet.message.trim().is_empty()
}

/// Returns true when `content` contains a decision-style claim an advisory
/// agent has no authority to make.
fn contains_decision(content: &str) -> bool {
    let lowered = content.to_lowercase();
    DECISION_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

// ============================================================================
// SECTION: Reducer
// ============================================================================

/// How completion-order-independent ties are broken by a `Vote` reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTiebreaker {
    /// Returns the first output in invocation order.
    First,
    /// Fails with [`OrchestratorError::VoteEscalation`].
    Escalate,
}

/// One of the four fold strategies applied to validated agent outputs.
pub enum Reducer {
    /// Returns the last output's content, for pipeline chains.
    PassThrough,
    /// Concatenates every output's content, optionally deduplicating
    /// identical messages or selecting only the highest-confidence one.
    Merge {
        /// Drop messages identical to one already kept.
        dedupe: bool,
        /// When true, return only the highest-`confidence` output instead
        /// of concatenating.
        select_best: bool,
    },
    /// Tallies string-equal content across outputs; the first bucket
    /// reaching `threshold`'s share of the vote wins.
    Vote {
        /// Minimum share of votes `[0.0, 1.0]` a bucket needs to win.
        threshold: f64,
        /// How to resolve a vote that reaches no winning bucket.
        tiebreaker: VoteTiebreaker,
    },
    /// Invokes an injected synthesis function over every output. Per
    /// spec.md §9 Open Questions, this function is treated as an opaque
    /// port with no re-entrant access back into the Orchestrator.
    Synthesize(Box<dyn Fn(&[AgentOutput]) -> String + Send + Sync>),
}

// ============================================================================
// SECTION: Orchestrator Result
// ============================================================================

/// The outcome of a single `execute` call.
#[derive(Debug, Clone)]
pub struct OrchestratorResult {
    /// Reduced content.
    pub content: String,
    /// Every agent output produced during the Map phase, in alphabetical
    /// `agent_id` order.
    pub agent_outputs: Vec<AgentOutput>,
    /// Agent ids invoked, in the alphabetical order they were dispatched.
    pub agents_invoked: Vec<AgentId>,
    /// Proposals collected from every validated packet, capped at
    /// `max_proposals_total`.
    pub proposals: Vec<Proposal>,
}

// ============================================================================
// SECTION: Orchestrator Config
// ============================================================================

/// Default for [`OrchestratorConfig::timeout_ms`], per spec.md §6.
const fn default_timeout_ms() -> u64 {
    30_000
}

/// Default for [`OrchestratorConfig::max_workers`], per spec.md §6.
const fn default_max_workers() -> usize {
    4
}

/// Default for [`OrchestratorConfig::max_agents`].
const fn default_max_agents() -> usize {
    8
}

/// Default for [`OrchestratorConfig::max_proposals_total`].
const fn default_max_proposals_total() -> usize {
    20
}

/// Tunable limits enforced by the Orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Wall-clock timeout in milliseconds for the parallel Map phase.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum worker threads used for a parallel Map phase.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Maximum agents a single `execute` call may invoke (panel budget).
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    /// Maximum proposals collected across every agent output.
    #[serde(default = "default_max_proposals_total")]
    pub max_proposals_total: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_workers: default_max_workers(),
            max_agents: default_max_agents(),
            max_proposals_total: default_max_proposals_total(),
        }
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Fans agent invocations out to a bounded worker pool and reduces their
/// outputs.
pub struct Orchestrator {
    /// Agent invocation ports keyed by agent id.
    processors: BTreeMap<AgentId, Box<dyn LlmPort + Send + Sync>>,
    /// Tunable limits.
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates an orchestrator with no registered agents.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            processors: BTreeMap::new(),
            config,
        }
    }

    /// Registers an agent's invocation port.
    pub fn register_agent(&mut self, agent_id: AgentId, processor: Box<dyn LlmPort + Send + Sync>) {
        self.processors.insert(agent_id, processor);
    }

    /// Invokes `agents` against `context`, validates each output, and
    /// reduces the results with `reducer`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::TooManyAgents`] when `agents` exceeds
    /// `max_agents`; [`OrchestratorError::AgentTimeout`] when a parallel Map
    /// phase exceeds `timeout_ms`; [`OrchestratorError::AgentViolation`]
    /// when any output fails the inlined shape/decision check; and
    /// [`OrchestratorError::VoteEscalation`] when a `Vote` reducer's
    /// tiebreaker is `escalate` and no bucket reached threshold.
    pub fn execute(
        &self,
        agents: &[AgentId],
        reducer: &Reducer,
        context: &AgentContext,
        parallel: bool,
    ) -> Result<OrchestratorResult, OrchestratorError> {
        if agents.len() > self.config.max_agents {
            return Err(OrchestratorError::TooManyAgents {
                requested: agents.len(),
                max_agents: self.config.max_agents,
            });
        }

        let mut sorted_agents = agents.to_vec();
        sorted_agents.sort_by(|left, right| left.as_str().cmp(right.as_str()));

        let outputs = if parallel && sorted_agents.len() > 1 {
            self.map_parallel(&sorted_agents, context)?
        } else {
            self.map_serial(&sorted_agents, context)
        };

        for output in &outputs {
            if let Some(packet) = &output.packet {
                if !is_valid_packet(packet) || contains_decision(&packet.message) {
                    return Err(OrchestratorError::AgentViolation(format!(
                        "agent {} produced an invalid or decision-bearing packet",
                        output.agent_id
                    )));
                }
            }
        }

        let content = self.reduce(&outputs, reducer)?;

        let mut proposals: Vec<Proposal> =
            outputs.iter().filter_map(|output| output.packet.as_ref()).flat_map(|packet| packet.proposals.clone()).collect();
        proposals.truncate(self.config.max_proposals_total);

        Ok(OrchestratorResult {
            content,
            agents_invoked: sorted_agents,
            agent_outputs: outputs,
            proposals,
        })
    }

    /// Invokes one agent, building its `LlmInvocation` from `prompt` and
    /// `tools`, and wrapping any port failure in an error-tagged output.
    fn invoke_one(&self, agent_id: &AgentId, prompt: &str, tools: &[ToolSpec]) -> AgentOutput {
        let Some(processor) = self.processors.get(agent_id) else {
            return AgentOutput {
                agent_id: agent_id.clone(),
                packet: None,
                error: Some(format!("unknown agent: {agent_id}")),
            };
        };
        let invocation = LlmInvocation {
            agent_id: agent_id.clone(),
            prompt: prompt.to_string(),
            available_tools: tools.to_vec(),
        };
        match processor.invoke(&invocation) {
            Ok(packet) => AgentOutput {
                agent_id: agent_id.clone(),
                packet: Some(packet),
                error: None,
            },
            Err(error) => AgentOutput {
                agent_id: agent_id.clone(),
                packet: None,
                error: Some(error.to_string()),
            },
        }
    }

    /// Invokes agents one at a time, chaining each prior output's message
    /// into the next agent's prompt.
    fn map_serial(&self, agents: &[AgentId], context: &AgentContext) -> Vec<AgentOutput> {
        let mut outputs = Vec::with_capacity(agents.len());
        let mut previous_message: Option<String> = None;
        for agent_id in agents {
            let prompt = match &previous_message {
                Some(previous) => format!("{}\n\n---\nprevious agent output:\n{previous}", context.prompt),
                None => context.prompt.clone(),
            };
            let output = self.invoke_one(agent_id, &prompt, &context.available_tools);
            previous_message = output.packet.as_ref().map(|packet| packet.message.clone());
            outputs.push(output);
        }
        outputs
    }

    /// Invokes agents concurrently across a bounded worker pool, applying a
    /// single wall-clock timeout across the whole batch. On timeout,
    /// outstanding work is abandoned: a shared cancellation flag stops
    /// workers from picking up further agents, and already-completed
    /// outputs are discarded per spec.md §5.
    fn map_parallel(&self, agents: &[AgentId], context: &AgentContext) -> Result<Vec<AgentOutput>, OrchestratorError> {
        let total = agents.len();
        let worker_count = self.config.max_workers.max(1).min(total);
        let deadline = Duration::from_millis(self.config.timeout_ms);

        let queue: Mutex<VecDeque<&AgentId>> = Mutex::new(agents.iter().collect());
        let cancelled = AtomicBool::new(false);
        let (sender, receiver) = mpsc::channel::<AgentOutput>();

        let (mut outputs, timed_out) = thread::scope(|scope| {
            for _ in 0..worker_count {
                let sender = sender.clone();
                let queue = &queue;
                let cancelled = &cancelled;
                scope.spawn(move || {
                    loop {
                        if cancelled.load(AtomicOrdering::Relaxed) {
                            break;
                        }
                        let Some(agent_id) = queue.lock().map_or(None, |mut guard| guard.pop_front()) else {
                            break;
                        };
                        let output = self.invoke_one(agent_id, &context.prompt, &context.available_tools);
                        if sender.send(output).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(sender);

            let started = Instant::now();
            let mut outputs = Vec::with_capacity(total);
            let mut timed_out = false;
            while outputs.len() < total {
                let Some(remaining) = deadline.checked_sub(started.elapsed()) else {
                    timed_out = true;
                    break;
                };
                match receiver.recv_timeout(remaining) {
                    Ok(output) => outputs.push(output),
                    Err(RecvTimeoutError::Timeout) => {
                        timed_out = true;
                        break;
                    },
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            if timed_out {
                cancelled.store(true, AtomicOrdering::Relaxed);
            }
            (outputs, timed_out)
        });

        if timed_out {
            return Err(OrchestratorError::AgentTimeout {
                completed: outputs.len(),
                total,
            });
        }

        outputs.sort_by(|left, right| left.agent_id.as_str().cmp(right.agent_id.as_str()));
        Ok(outputs)
    }

    /// Folds validated outputs down to a single content string per
    /// `reducer`.
    fn reduce(&self, outputs: &[AgentOutput], reducer: &Reducer) -> Result<String, OrchestratorError> {
        match reducer {
            Reducer::PassThrough => {
                Ok(outputs.last().and_then(|output| output.packet.as_ref()).map(|packet| packet.message.clone()).unwrap_or_default())
            },
            Reducer::Merge {
                dedupe,
                select_best,
            } => Ok(Self::reduce_merge(outputs, *dedupe, *select_best)),
            Reducer::Vote {
                threshold,
                tiebreaker,
            } => Self::reduce_vote(outputs, *threshold, *tiebreaker),
            Reducer::Synthesize(synthesize) => Ok(synthesize(outputs)),
        }
    }

    /// Implements the `Merge` reducer: concatenate, optionally deduping or
    /// selecting the single highest-confidence output.
    fn reduce_merge(outputs: &[AgentOutput], dedupe: bool, select_best: bool) -> String {
        if select_best {
            return outputs
                .iter()
                .filter_map(|output| output.packet.as_ref())
                .max_by(|left, right| left.confidence.partial_cmp(&right.confidence).unwrap_or(CmpOrdering::Equal))
                .map(|packet| packet.message.clone())
                .unwrap_or_default();
        }
        let mut messages: Vec<&str> = outputs.iter().filter_map(|output| output.packet.as_ref()).map(|packet| packet.message.as_str()).collect();
        if dedupe {
            let mut seen = BTreeSet::new();
            messages.retain(|message| seen.insert(*message));
        }
        messages.join("\n\n")
    }

    /// Implements the `Vote` reducer: tallies string-equal content and
    /// picks the first bucket (in first-seen order) whose share reaches
    /// `threshold`.
    #[allow(clippy::cast_precision_loss, reason = "vote share is a coarse ratio over small agent counts")]
    fn reduce_vote(outputs: &[AgentOutput], threshold: f64, tiebreaker: VoteTiebreaker) -> Result<String, OrchestratorError> {
        let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
        let mut first_seen_order: Vec<&str> = Vec::new();
        let mut total_votes = 0_usize;
        for packet in outputs.iter().filter_map(|output| output.packet.as_ref()) {
            let content = packet.message.as_str();
            if !tally.contains_key(content) {
                first_seen_order.push(content);
            }
            *tally.entry(content).or_insert(0) += 1;
            total_votes += 1;
        }

        let winner = first_seen_order.iter().find(|content| {
            let share = tally.get(**content).copied().unwrap_or(0) as f64 / total_votes.max(1) as f64;
            share >= threshold
        });

        match winner {
            Some(content) => Ok((*content).to_string()),
            None => match tiebreaker {
                VoteTiebreaker::First => Ok(first_seen_order.first().map(|content| (*content).to_string()).unwrap_or_default()),
                VoteTiebreaker::Escalate => Err(OrchestratorError::VoteEscalation),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use std::collections::BTreeMap;

    use agent_kernel_core::interfaces::LlmError;
    use serde_json::json;

    use super::*;

    struct FixedProcessor {
        message: String,
        confidence: f64,
    }

    impl LlmPort for FixedProcessor {
        fn invoke(&self, request: &LlmInvocation) -> Result<AgentPacket, LlmError> {
            let mut traces = BTreeMap::new();
            traces.insert("agent_id".to_string(), json!(request.agent_id.as_str()));
            Ok(AgentPacket {
                message: self.message.clone(),
                proposals: vec![],
                confidence: self.confidence,
                traces,
            })
        }
    }

    struct FailingProcessor;

    impl LlmPort for FailingProcessor {
        fn invoke(&self, _request: &LlmInvocation) -> Result<AgentPacket, LlmError> {
            Err(LlmError::Backend("simulated failure".to_string()))
        }
    }

    fn context() -> AgentContext {
        AgentContext {
            prompt: "draft a summary".to_string(),
            available_tools: vec![],
        }
    }

    #[test]
    fn serial_execute_passes_through_last_output() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        orchestrator.register_agent(
            AgentId::new("analyst"),
            Box::new(FixedProcessor {
                message: "analysis".to_string(),
                confidence: 0.7,
            }),
        );
        orchestrator.register_agent(
            AgentId::new("writer"),
            Box::new(FixedProcessor {
                message: "final draft".to_string(),
                confidence: 0.9,
            }),
        );
        let result = orchestrator
            .execute(&[AgentId::new("analyst"), AgentId::new("writer")], &Reducer::PassThrough, &context(), false)
            .expect("execute");
        assert_eq!(result.content, "final draft");
        assert_eq!(result.agents_invoked, vec![AgentId::new("analyst"), AgentId::new("writer")]);
    }

    #[test]
    fn parallel_merge_is_deterministic_regardless_of_agent_order() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        orchestrator.register_agent(
            AgentId::new("analyst"),
            Box::new(FixedProcessor {
                message: "a".to_string(),
                confidence: 0.5,
            }),
        );
        orchestrator.register_agent(
            AgentId::new("writer"),
            Box::new(FixedProcessor {
                message: "b".to_string(),
                confidence: 0.5,
            }),
        );
        let reducer = Reducer::Merge {
            dedupe: false,
            select_best: false,
        };
        let forward = orchestrator
            .execute(&[AgentId::new("analyst"), AgentId::new("writer")], &reducer, &context(), true)
            .expect("forward execute");
        let reversed = orchestrator
            .execute(&[AgentId::new("writer"), AgentId::new("analyst")], &reducer, &context(), true)
            .expect("reversed execute");
        assert_eq!(forward.content, reversed.content);
        assert_eq!(forward.agents_invoked, vec![AgentId::new("analyst"), AgentId::new("writer")]);
    }

    #[test]
    fn vote_reducer_picks_majority_bucket() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        for (name, message) in [("a1", "yes"), ("a2", "yes"), ("a3", "no")] {
            orchestrator.register_agent(
                AgentId::new(name),
                Box::new(FixedProcessor {
                    message: message.to_string(),
                    confidence: 0.5,
                }),
            );
        }
        let reducer = Reducer::Vote {
            threshold: 0.5,
            tiebreaker: VoteTiebreaker::Escalate,
        };
        let result = orchestrator
            .execute(&[AgentId::new("a1"), AgentId::new("a2"), AgentId::new("a3")], &reducer, &context(), false)
            .expect("execute");
        assert_eq!(result.content, "yes");
    }

    #[test]
    fn vote_without_majority_escalates() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        for (name, message) in [("a1", "yes"), ("a2", "no")] {
            orchestrator.register_agent(
                AgentId::new(name),
                Box::new(FixedProcessor {
                    message: message.to_string(),
                    confidence: 0.5,
                }),
            );
        }
        let reducer = Reducer::Vote {
            threshold: 0.75,
            tiebreaker: VoteTiebreaker::Escalate,
        };
        let error = orchestrator.execute(&[AgentId::new("a1"), AgentId::new("a2")], &reducer, &context(), false).unwrap_err();
        assert!(matches!(error, OrchestratorError::VoteEscalation));
    }

    #[test]
    fn decision_bearing_message_is_a_violation() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        orchestrator.register_agent(
            AgentId::new("writer"),
            Box::new(FixedProcessor {
                message: "The decision is to proceed.".to_string(),
                confidence: 0.9,
            }),
        );
        let error =
            orchestrator.execute(&[AgentId::new("writer")], &Reducer::PassThrough, &context(), false).unwrap_err();
        assert!(matches!(error, OrchestratorError::AgentViolation(_)));
    }

    #[test]
    fn failing_agent_becomes_error_tagged_output() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::default());
        orchestrator.register_agent(AgentId::new("flaky"), Box::new(FailingProcessor));
        let result = orchestrator
            .execute(&[AgentId::new("flaky")], &Reducer::PassThrough, &context(), false)
            .expect("execute despite agent failure");
        assert_eq!(result.agent_outputs.len(), 1);
        assert!(result.agent_outputs[0].error.is_some());
        assert!(result.agent_outputs[0].packet.is_none());
    }

    #[test]
    fn too_many_agents_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.max_agents = 1;
        let orchestrator = Orchestrator::new(config);
        let error = orchestrator
            .execute(&[AgentId::new("a1"), AgentId::new("a2")], &Reducer::PassThrough, &context(), false)
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::TooManyAgents { .. }));
    }
}

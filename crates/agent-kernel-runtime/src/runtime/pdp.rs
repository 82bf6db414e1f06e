// agent-kernel-runtime/src/runtime/pdp.rs
// ============================================================================
// Module: Policy Decision Point
// Description: Pure allow/deny function over a tool invocation request.
// Purpose: Implement the seven short-circuiting checks from spec.md §4.6.
// Dependencies: agent_kernel_core::{ToolSpec, SideEffectClass, CapabilityId}
// ============================================================================

//! ## Overview
//! The PDP never mutates state and never executes a tool; it is a pure
//! function from `(request, spec, context)` to a decision. `emotional_signals`
//! is carried on [`PolicyContext`] for audit metadata only and has no field
//! read anywhere in [`evaluate`], so it cannot influence the outcome by
//! construction (spec.md §9 Open Questions).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use agent_kernel_core::CapabilityId;
use agent_kernel_core::LaneId;
use agent_kernel_core::ProposalId;
use agent_kernel_core::SideEffectClass;
use agent_kernel_core::ToolId;
use agent_kernel_core::ToolSpec;
use serde_json::Value;

// ============================================================================
// SECTION: Tool Invocation Request
// ============================================================================

/// A single tool invocation request submitted for policy evaluation.
#[derive(Debug, Clone)]
pub struct ToolInvocationRequest {
    /// Identifier used for deterministic batch ordering.
    pub proposal_id: ProposalId,
    /// Tool being invoked.
    pub tool_id: ToolId,
    /// Arguments to pass to the connector.
    pub args: Value,
}

// ============================================================================
// SECTION: Policy Context
// ============================================================================

/// Everything the PDP needs to decide, besides the request and spec.
#[derive(Debug, Clone, Default)]
pub struct PolicyContext {
    /// Capability scopes granted for this turn.
    pub granted_scopes: BTreeSet<CapabilityId>,
    /// Active lane, if any, and its tool-request budget for this turn.
    pub lane_id: Option<LaneId>,
    /// Configured maximum tool requests per turn for the active lane.
    pub max_tool_requests_per_turn: Option<u32>,
    /// Tool requests already allowed this turn.
    pub tool_requests_this_turn: u32,
    /// Tool ids the user has pre-approved for this turn.
    pub pending_approvals: BTreeSet<ToolId>,
    /// Blanket write approval for this turn.
    pub write_approval_granted: bool,
    /// Tools denied outright by the constitution.
    pub denied_tools: BTreeSet<ToolId>,
    /// Path prefixes denied outright by the constitution.
    pub denied_path_prefixes: Vec<String>,
    /// Metadata only; never read by [`evaluate`]. See the module overview.
    pub emotional_signals: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Policy Decision
// ============================================================================

/// An obligation the caller must discharge when a decision is acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Obligation {
    /// An audit record must be written.
    Audit,
    /// User approval must be obtained before the tool may run.
    ApprovalRequired,
}

/// The PDP's verdict on a single tool invocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Human-readable reason.
    pub reason: String,
    /// True when denial is solely due to missing write approval.
    pub needs_approval: bool,
    /// Obligations the caller must discharge.
    pub obligations: Vec<Obligation>,
}

impl PolicyDecision {
    /// Builds a denial with no obligations.
    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            needs_approval: false,
            obligations: Vec::new(),
        }
    }

    /// Builds a denial carrying the `approval_required` obligation.
    fn needs_approval(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            needs_approval: true,
            obligations: vec![Obligation::ApprovalRequired],
        }
    }

    /// Builds an allow decision carrying the `audit` obligation.
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: "ok".to_string(),
            needs_approval: false,
            obligations: vec![Obligation::Audit],
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a single tool invocation request, per the ordered,
/// short-circuiting checks in spec.md §4.6.
///
/// `spec` is `None` when the tool is unknown.
#[must_use]
pub fn evaluate(request: &ToolInvocationRequest, spec: Option<&ToolSpec>, context: &PolicyContext) -> PolicyDecision {
    let Some(spec) = spec else {
        return PolicyDecision::deny(format!("unknown tool: {}", request.tool_id));
    };

    let missing_scopes: Vec<&CapabilityId> =
        spec.required_scopes.iter().filter(|scope| !context.granted_scopes.contains(*scope)).collect();
    if !missing_scopes.is_empty() {
        let missing = missing_scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(", ");
        return PolicyDecision::deny(format!("missing required scopes: {missing}"));
    }

    if let Some(max_requests) = context.max_tool_requests_per_turn {
        if context.tool_requests_this_turn >= max_requests {
            return PolicyDecision::deny(format!(
                "lane budget exceeded: {}/{max_requests} requests",
                context.tool_requests_this_turn
            ));
        }
    }

    if spec.side_effect == SideEffectClass::Write
        && !context.write_approval_granted
        && !context.pending_approvals.contains(&request.tool_id)
    {
        return PolicyDecision::needs_approval("write operations require explicit user approval");
    }

    if matches!(spec.side_effect, SideEffectClass::Network | SideEffectClass::External) {
        return PolicyDecision::deny("network/external operations are not allowed in this release");
    }

    if context.denied_tools.contains(&request.tool_id) {
        return PolicyDecision::deny(format!("tool {} denied by constitution", request.tool_id));
    }

    if let Some(path) = request.args.get("path").and_then(Value::as_str) {
        if let Some(denied_prefix) = context.denied_path_prefixes.iter().find(|prefix| path.starts_with(prefix.as_str())) {
            return PolicyDecision::deny(format!("path {path} denied by constitution prefix {denied_prefix}"));
        }
    }

    PolicyDecision::allow()
}

/// Evaluates a batch of requests in deterministic `proposal_id` order,
/// incrementing `context.tool_requests_this_turn` after every allow.
pub fn evaluate_batch(
    requests: &[ToolInvocationRequest],
    specs: &BTreeMap<ToolId, ToolSpec>,
    context: &mut PolicyContext,
) -> Vec<PolicyDecision> {
    let mut ordered: Vec<&ToolInvocationRequest> = requests.iter().collect();
    ordered.sort_by(|left, right| left.proposal_id.as_str().cmp(right.proposal_id.as_str()));

    ordered
        .into_iter()
        .map(|request| {
            let decision = evaluate(request, specs.get(&request.tool_id), context);
            if decision.allowed {
                context.tool_requests_this_turn += 1;
            }
            decision
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use serde_json::json;

    use super::*;

    fn sample_spec(side_effect: SideEffectClass) -> ToolSpec {
        ToolSpec {
            id: ToolId::new("fs.write_file"),
            version: "1.0.0".to_string(),
            side_effect,
            required_scopes: BTreeSet::new(),
            connector: "local_fs".to_string(),
            input_schema: json!({"type": "object"}),
            output_schema: json!({"type": "object"}),
            description: "writes a file".to_string(),
        }
    }

    fn request() -> ToolInvocationRequest {
        ToolInvocationRequest {
            proposal_id: ProposalId::new("p1"),
            tool_id: ToolId::new("fs.write_file"),
            args: json!({}),
        }
    }

    #[test]
    fn unknown_tool_is_denied() {
        let decision = evaluate(&request(), None, &PolicyContext::default());
        assert!(!decision.allowed);
        assert!(decision.reason.contains("unknown tool"));
    }

    #[test]
    fn missing_scopes_deny_even_with_known_tool() {
        let mut spec = sample_spec(SideEffectClass::Read);
        spec.required_scopes.insert(CapabilityId::new("fs.write"));
        let decision = evaluate(&request(), Some(&spec), &PolicyContext::default());
        assert!(!decision.allowed);
        assert!(decision.reason.contains("missing required scopes"));
    }

    #[test]
    fn write_without_approval_needs_approval() {
        let spec = sample_spec(SideEffectClass::Write);
        let decision = evaluate(&request(), Some(&spec), &PolicyContext::default());
        assert!(!decision.allowed);
        assert!(decision.needs_approval);
        assert_eq!(decision.obligations, vec![Obligation::ApprovalRequired]);
    }

    #[test]
    fn write_with_blanket_approval_is_allowed() {
        let spec = sample_spec(SideEffectClass::Write);
        let context = PolicyContext {
            write_approval_granted: true,
            ..PolicyContext::default()
        };
        let decision = evaluate(&request(), Some(&spec), &context);
        assert!(decision.allowed);
        assert_eq!(decision.obligations, vec![Obligation::Audit]);
    }

    #[test]
    fn network_side_effect_is_denied() {
        let spec = sample_spec(SideEffectClass::Network);
        let decision = evaluate(&request(), Some(&spec), &PolicyContext::default());
        assert!(!decision.allowed);
        assert!(!decision.needs_approval);
    }

    #[test]
    fn denied_path_prefix_blocks_read() {
        let spec = sample_spec(SideEffectClass::Read);
        let mut req = request();
        req.args = json!({"path": "/etc/shadow"});
        let context = PolicyContext {
            denied_path_prefixes: vec!["/etc".to_string()],
            ..PolicyContext::default()
        };
        let decision = evaluate(&req, Some(&spec), &context);
        assert!(!decision.allowed);
    }

    #[test]
    fn evaluate_batch_sorts_by_proposal_id_and_increments_budget() {
        let mut specs = BTreeMap::new();
        specs.insert(ToolId::new("fs.write_file"), sample_spec(SideEffectClass::Read));
        let requests = vec![
            ToolInvocationRequest {
                proposal_id: ProposalId::new("p2"),
                tool_id: ToolId::new("fs.write_file"),
                args: json!({}),
            },
            ToolInvocationRequest {
                proposal_id: ProposalId::new("p1"),
                tool_id: ToolId::new("fs.write_file"),
                args: json!({}),
            },
        ];
        let mut context = PolicyContext::default();
        let decisions = evaluate_batch(&requests, &specs, &mut context);
        assert_eq!(decisions.len(), 2);
        assert!(decisions.iter().all(|decision| decision.allowed));
        assert_eq!(context.tool_requests_this_turn, 2);
    }
}

// agent-kernel-runtime/src/runtime/tool_runtime.rs
// ============================================================================
// Module: Tool Runtime (Policy Enforcement Point)
// Description: Enforces Policy Decision Point verdicts and dispatches
// approved tool invocations to connectors.
// Purpose: Implement invoke/invoke_with_approval/invoke_batch per spec.md
// §4.7.
// Dependencies: crate::runtime::pdp, agent_kernel_core::{ToolSpec,
// AuditEvent}, agent_kernel_core::interfaces::Connector
// ============================================================================

//! ## Overview
//! The Tool Runtime is the Policy Enforcement Point: it never decides
//! whether a call is authorized (that is the PDP's job) and never lets a
//! connector run before the PDP has allowed the call. Every invocation,
//! allowed or denied, produces an [`AuditEvent`]; connectors are required to
//! make writes atomic so a denied or failed call leaves no observable side
//! effect (spec.md §4.7 step 7).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Instant;

use agent_kernel_core::AgentId;
use agent_kernel_core::AuditDecision;
use agent_kernel_core::AuditEvent;
use agent_kernel_core::AuditId;
use agent_kernel_core::LaneId;
use agent_kernel_core::RequestId;
use agent_kernel_core::Timestamp;
use agent_kernel_core::ToolId;
use agent_kernel_core::ToolSpec;
use agent_kernel_core::TurnId;
use agent_kernel_core::interfaces::Connector;
use agent_kernel_core::interfaces::ConnectorError;
use serde_json::Value;
use thiserror::Error;

use crate::runtime::pdp::Obligation;
use crate::runtime::pdp::PolicyContext;
use crate::runtime::pdp::ToolInvocationRequest;
use crate::runtime::pdp::evaluate;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Tool Runtime.
#[derive(Debug, Error)]
pub enum ToolRuntimeError {
    /// No connector is registered under the name a `ToolSpec` declares.
    #[error("no connector registered for {0}")]
    UnknownConnector(String),
}

// ============================================================================
// SECTION: Invocation Context
// ============================================================================

/// Everything the Tool Runtime needs beyond the request and policy context:
/// the turn, lane, and agent the request is attributed to for audit.
#[derive(Debug, Clone)]
pub struct ToolRuntimeContext {
    /// Policy evaluation context passed through to the PDP unchanged.
    pub policy: PolicyContext,
    /// Turn the invocation occurred on.
    pub turn: TurnId,
    /// Lane the request originated from, if any.
    pub lane_id: Option<LaneId>,
    /// Agent the request originated from, if any.
    pub agent_id: Option<AgentId>,
}

// ============================================================================
// SECTION: Tool Result
// ============================================================================

/// Outcome of a single tool invocation attempt.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// True when the connector executed successfully.
    pub ok: bool,
    /// Connector return value, present only when `ok`.
    pub value: Option<Value>,
    /// Wall-clock milliseconds the connector call took. Zero for requests
    /// that never reached a connector.
    pub execution_ms: u64,
    /// Audit record produced for this invocation.
    pub audit_id: AuditId,
    /// Machine-readable error code, set whenever `ok` is false (e.g.
    /// `APPROVAL_REQUIRED`, `UNKNOWN_TOOL`, `INVALID_ARGS`,
    /// `UNKNOWN_CONNECTOR`, `CONNECTOR_ERROR`).
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

/// Validates `args` against `schema`'s `required` field list and each
/// declared property's basic JSON type, per spec.md §4.7 step 2. This is
/// intentionally shallow: nested schemas and formats are out of scope.
fn validate_args_against_schema(args: &Value, schema: &Value) -> Result<(), String> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return validate_properties(args, schema);
    };
    for field in required {
        let Some(field_name) = field.as_str() else {
            continue;
        };
        if args.get(field_name).is_none() {
            return Err(format!("missing required field: {field_name}"));
        }
    }
    validate_properties(args, schema)
}

/// Checks each property present in `args` against its declared `type`.
fn validate_properties(args: &Value, schema: &Value) -> Result<(), String> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (field_name, field_schema) in properties {
        let Some(value) = args.get(field_name) else {
            continue;
        };
        let Some(expected_type) = field_schema.get("type").and_then(Value::as_str) else {
            continue;
        };
        if !value_matches_type(value, expected_type) {
            return Err(format!("field {field_name} expected type {expected_type}"));
        }
    }
    Ok(())
}

/// Returns true when `value`'s JSON type matches `expected_type`.
fn value_matches_type(value: &Value, expected_type: &str) -> bool {
    match expected_type {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

// ============================================================================
// SECTION: Tool Runtime
// ============================================================================

/// The Policy Enforcement Point. Dispatches approved tool invocations to
/// registered connectors.
pub struct ToolRuntime {
    /// Declared tool contracts keyed by id.
    specs: BTreeMap<ToolId, ToolSpec>,
    /// Registered connectors keyed by connector name.
    connectors: BTreeMap<String, Box<dyn Connector>>,
    /// Monotonic counter backing generated audit ids.
    next_audit_sequence: u64,
}

impl ToolRuntime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self {
            specs: BTreeMap::new(),
            connectors: BTreeMap::new(),
            next_audit_sequence: 0,
        }
    }

    /// Registers a tool contract.
    pub fn register_spec(&mut self, spec: ToolSpec) {
        self.specs.insert(spec.id.clone(), spec);
    }

    /// Registers a connector under `name`.
    pub fn register_connector(&mut self, name: impl Into<String>, connector: Box<dyn Connector>) {
        self.connectors.insert(name.into(), connector);
    }

    /// Generates the next deterministic audit id.
    fn next_audit_id(&mut self) -> AuditId {
        let id = AuditId::new(format!("audit-{:08}", self.next_audit_sequence));
        self.next_audit_sequence += 1;
        id
    }

    /// Builds a denial result and its matching audit event.
    fn deny(
        &mut self,
        request: &ToolInvocationRequest,
        error_code: &'static str,
        reason: impl Into<String>,
        obligations: Vec<String>,
        context: &ToolRuntimeContext,
        at: Timestamp,
    ) -> (ToolResult, AuditEvent) {
        let audit_id = self.next_audit_id();
        let audit = AuditEvent {
            id: audit_id.clone(),
            timestamp: at,
            decision: AuditDecision::Deny,
            tool_id: request.tool_id.clone(),
            request_id: RequestId::new(request.proposal_id.as_str()),
            reason: reason.into(),
            lane_id: context.lane_id.clone(),
            agent_id: context.agent_id.clone(),
            turn_id: context.turn,
            obligations,
            emotional_signals: context.policy.emotional_signals.clone(),
        };
        (
            ToolResult {
                ok: false,
                value: None,
                execution_ms: 0,
                audit_id,
                error: Some(error_code.to_string()),
            },
            audit,
        )
    }

    /// Invokes a single tool request, running the full pipeline from
    /// spec.md §4.7: spec lookup, schema validation, PDP evaluation,
    /// connector lookup, and dispatch. Always returns a [`ToolResult`]
    /// alongside the [`AuditEvent`] the caller is responsible for recording
    /// (typically by appending it to the Episodic Trace).
    pub fn invoke(
        &mut self,
        request: &ToolInvocationRequest,
        context: &ToolRuntimeContext,
        at: Timestamp,
    ) -> (ToolResult, AuditEvent) {
        let Some(spec) = self.specs.get(&request.tool_id).cloned() else {
            return self.deny(request, "UNKNOWN_TOOL", format!("unknown tool: {}", request.tool_id), vec![], context, at);
        };

        if let Err(detail) = validate_args_against_schema(&request.args, &spec.input_schema) {
            return self.deny(request, "INVALID_ARGS", format!("invalid arguments: {detail}"), vec![], context, at);
        }

        let decision = evaluate(request, Some(&spec), &context.policy);
        if !decision.allowed {
            let error_code = if decision.needs_approval { "APPROVAL_REQUIRED" } else { "DENIED" };
            let obligations = decision.obligations.iter().map(obligation_label).collect();
            return self.deny(request, error_code, decision.reason, obligations, context, at);
        }

        let Some(connector) = self.connectors.get(&spec.connector) else {
            return self.deny(
                request,
                "UNKNOWN_CONNECTOR",
                format!("no connector registered for {}", spec.connector),
                vec![],
                context,
                at,
            );
        };

        let started = Instant::now();
        match connector.invoke(&request.tool_id, &request.args) {
            Ok(value) => {
                let execution_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let audit_id = self.next_audit_id();
                let audit = AuditEvent {
                    id: audit_id.clone(),
                    timestamp: at,
                    decision: AuditDecision::Allow,
                    tool_id: request.tool_id.clone(),
                    request_id: RequestId::new(request.proposal_id.as_str()),
                    reason: "ok".to_string(),
                    lane_id: context.lane_id.clone(),
                    agent_id: context.agent_id.clone(),
                    turn_id: context.turn,
                    obligations: vec!["audit".to_string()],
                    emotional_signals: context.policy.emotional_signals.clone(),
                };
                (
                    ToolResult {
                        ok: true,
                        value: Some(value),
                        execution_ms,
                        audit_id,
                        error: None,
                    },
                    audit,
                )
            },
            Err(error) => self.deny(request, "CONNECTOR_ERROR", connector_error_reason(&error), vec![], context, at),
        }
    }

    /// Invokes a request that was previously denied pending approval,
    /// re-evaluating with `user_approved` folded into the policy context's
    /// pending-approval set.
    pub fn invoke_with_approval(
        &mut self,
        request: &ToolInvocationRequest,
        context: &ToolRuntimeContext,
        user_approved: bool,
        at: Timestamp,
    ) -> (ToolResult, AuditEvent) {
        let mut context = context.clone();
        if user_approved {
            context.policy.pending_approvals.insert(request.tool_id.clone());
        }
        self.invoke(request, &context, at)
    }

    /// Invokes a batch of requests in deterministic `proposal_id` order,
    /// threading the shared policy context's per-turn budget across calls.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRuntimeError`] only in the degenerate case where the
    /// runtime itself cannot proceed; individual per-request denials are
    /// carried in the returned [`ToolResult`]s, not as errors.
    pub fn invoke_batch(
        &mut self,
        requests: &[ToolInvocationRequest],
        context: &mut ToolRuntimeContext,
        at: Timestamp,
    ) -> Result<Vec<(ToolResult, AuditEvent)>, ToolRuntimeError> {
        let mut ordered: Vec<&ToolInvocationRequest> = requests.iter().collect();
        ordered.sort_by(|left, right| left.proposal_id.as_str().cmp(right.proposal_id.as_str()));

        let mut results = Vec::with_capacity(ordered.len());
        for request in ordered {
            let (result, audit) = self.invoke(request, context, at);
            if result.ok {
                context.policy.tool_requests_this_turn += 1;
            }
            results.push((result, audit));
        }
        Ok(results)
    }
}

impl Default for ToolRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps an [`Obligation`] to its audit-record label.
fn obligation_label(obligation: &Obligation) -> String {
    match obligation {
        Obligation::Audit => "audit".to_string(),
        Obligation::ApprovalRequired => "approval_required".to_string(),
    }
}

/// Maps a [`ConnectorError`] to a human-readable audit reason.
fn connector_error_reason(error: &ConnectorError) -> String {
    format!("connector error: {error}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use std::collections::BTreeSet;

    use agent_kernel_core::ProposalId;
    use agent_kernel_core::SideEffectClass;
    use serde_json::json;

    use super::*;

    struct EchoConnector;

    impl Connector for EchoConnector {
        fn declared_tools(&self) -> Vec<ToolSpec> {
            vec![]
        }

        fn invoke(&self, _tool_id: &ToolId, args: &Value) -> Result<Value, ConnectorError> {
            Ok(args.clone())
        }
    }

    fn read_spec() -> ToolSpec {
        ToolSpec {
            id: ToolId::new("fs.read_file"),
            version: "1.0.0".to_string(),
            side_effect: SideEffectClass::Read,
            required_scopes: BTreeSet::new(),
            connector: "local_fs".to_string(),
            input_schema: json!({"type": "object", "required": ["path"], "properties": {"path": {"type": "string"}}}),
            output_schema: json!({"type": "object"}),
            description: "reads a file".to_string(),
        }
    }

    fn context() -> ToolRuntimeContext {
        ToolRuntimeContext {
            policy: PolicyContext::default(),
            turn: 1,
            lane_id: None,
            agent_id: None,
        }
    }

    #[test]
    fn unknown_tool_denies_with_audit() {
        let mut runtime = ToolRuntime::new();
        let request = ToolInvocationRequest {
            proposal_id: ProposalId::new("p1"),
            tool_id: ToolId::new("fs.read_file"),
            args: json!({}),
        };
        let (result, audit) = runtime.invoke(&request, &context(), Timestamp::Logical(1));
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("UNKNOWN_TOOL"));
        assert_eq!(audit.decision, AuditDecision::Deny);
    }

    #[test]
    fn missing_required_field_is_invalid_args() {
        let mut runtime = ToolRuntime::new();
        runtime.register_spec(read_spec());
        runtime.register_connector("local_fs", Box::new(EchoConnector));
        let request = ToolInvocationRequest {
            proposal_id: ProposalId::new("p1"),
            tool_id: ToolId::new("fs.read_file"),
            args: json!({}),
        };
        let (result, _audit) = runtime.invoke(&request, &context(), Timestamp::Logical(1));
        assert_eq!(result.error.as_deref(), Some("INVALID_ARGS"));
    }

    #[test]
    fn successful_invocation_dispatches_to_connector() {
        let mut runtime = ToolRuntime::new();
        runtime.register_spec(read_spec());
        runtime.register_connector("local_fs", Box::new(EchoConnector));
        let request = ToolInvocationRequest {
            proposal_id: ProposalId::new("p1"),
            tool_id: ToolId::new("fs.read_file"),
            args: json!({"path": "a.txt"}),
        };
        let (result, audit) = runtime.invoke(&request, &context(), Timestamp::Logical(1));
        assert!(result.ok);
        assert_eq!(result.value, Some(json!({"path": "a.txt"})));
        assert_eq!(audit.decision, AuditDecision::Allow);
    }

    #[test]
    fn write_requires_approval_then_succeeds_on_retry() {
        let mut write_spec = read_spec();
        write_spec.id = ToolId::new("fs.write_file");
        write_spec.side_effect = SideEffectClass::Write;
        write_spec.input_schema = json!({"type": "object"});

        let mut runtime = ToolRuntime::new();
        runtime.register_spec(write_spec);
        runtime.register_connector("local_fs", Box::new(EchoConnector));

        let request = ToolInvocationRequest {
            proposal_id: ProposalId::new("p1"),
            tool_id: ToolId::new("fs.write_file"),
            args: json!({"path": "a.txt", "content": "x"}),
        };
        let (denied, _) = runtime.invoke(&request, &context(), Timestamp::Logical(1));
        assert_eq!(denied.error.as_deref(), Some("APPROVAL_REQUIRED"));

        let (approved, _) = runtime.invoke_with_approval(&request, &context(), true, Timestamp::Logical(2));
        assert!(approved.ok);
    }
}

// agent-kernel-core/tests/roundtrip.rs
// ============================================================================
// Module: Entity Round-Trip Tests
// Description: Serde round-trip coverage for persisted core entities.
// Purpose: Validate to_dict/from_dict = id for every type spec.md §8 names.
// Dependencies: agent-kernel-core, serde_json
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use agent_kernel_core::AgentDefinition;
use agent_kernel_core::AgentId;
use agent_kernel_core::BlastRadius;
use agent_kernel_core::CommitmentLease;
use agent_kernel_core::ConflictLevel;
use agent_kernel_core::EventId;
use agent_kernel_core::GateRequestName;
use agent_kernel_core::Horizon;
use agent_kernel_core::Lane;
use agent_kernel_core::LaneBudgets;
use agent_kernel_core::LaneId;
use agent_kernel_core::LaneLease;
use agent_kernel_core::LaneSnapshot;
use agent_kernel_core::LaneStatus;
use agent_kernel_core::LeaseMode;
use agent_kernel_core::Lifecycle;
use agent_kernel_core::PatternId;
use agent_kernel_core::PatternRecord;
use agent_kernel_core::Proposal;
use agent_kernel_core::ProposalId;
use agent_kernel_core::ProposalKind;
use agent_kernel_core::ProposalSource;
use agent_kernel_core::PromptProfile;
use agent_kernel_core::Severity;
use agent_kernel_core::SideEffectClass;
use agent_kernel_core::Timestamp;
use agent_kernel_core::ToolId;
use agent_kernel_core::ToolSpec;
use agent_kernel_core::WriteSignals;

fn roundtrips<T>(value: &T)
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de> + PartialEq + std::fmt::Debug,
{
    let json = serde_json::to_string(value).expect("serialize");
    let decoded: T = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(&decoded, value);
}

#[test]
fn commitment_lease_roundtrips() {
    let lease = CommitmentLease::new(
        "ship the release",
        Horizon::Mid,
        vec!["tests pass".to_string()],
        vec!["no scope creep".to_string()],
        4,
        "continue?",
    );
    roundtrips(&lease);
}

#[test]
fn lane_roundtrips() {
    let lane = Lane {
        lane_id: LaneId::new("lane-1"),
        kind: "research".to_string(),
        status: LaneStatus::Paused,
        lease: LaneLease {
            mode: LeaseMode::Execution,
            goal: "investigate the outage".to_string(),
            expires_at: Timestamp::Logical(42),
        },
        policy: serde_json::json!({"max_depth": 3}),
        budgets: LaneBudgets {
            max_tool_requests_per_turn: 5,
        },
        snapshot: LaneSnapshot {
            bookmark: "paused at step 3".to_string(),
            next_steps: vec!["check the logs".to_string()],
            open_questions: vec![],
        },
    };
    let json = serde_json::to_string(&lane).expect("serialize");
    let decoded: Lane = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded.lane_id, lane.lane_id);
    assert_eq!(decoded.status, lane.status);
    assert_eq!(decoded.snapshot.bookmark, lane.snapshot.bookmark);
}

#[test]
fn proposal_roundtrips_for_every_kind() {
    let kinds = vec![
        ProposalKind::GateRequest {
            gate: GateRequestName::new("framing"),
            reason: "shift into discovery".to_string(),
            severity: Severity::Medium,
        },
        ProposalKind::ToolRequest {
            tool_id: ToolId::new("fs.read_file"),
            args: serde_json::json!({"path": "a.txt"}),
        },
        ProposalKind::ContrastReport {
            gap_severity: Severity::High,
            description: "expected output missing".to_string(),
        },
        ProposalKind::PerceptionSignal {
            signal_kind: "user_idle".to_string(),
            payload: serde_json::json!({"seconds": 30}),
        },
    ];
    for kind in kinds {
        let proposal = Proposal::new(ProposalId::new("p1"), kind, ProposalSource::Agent);
        let json = serde_json::to_string(&proposal).expect("serialize");
        let decoded: Proposal = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.id, proposal.id);
    }
}

#[test]
fn agent_definition_roundtrips() {
    let definition = AgentDefinition {
        agent_id: AgentId::new("writer"),
        version: "1.2.0".to_string(),
        role: "writer".to_string(),
        lifecycle: Lifecycle::Session,
        routing_tags: BTreeSet::from(["drafting".to_string()]),
        prompt_profile: PromptProfile {
            style: "concise".to_string(),
            tone: "direct".to_string(),
            max_words: 150,
        },
        requested_scopes: BTreeSet::new(),
        allowed_tool_requests: BTreeSet::from([ToolId::new("fs.write_file")]),
        allowed_gate_requests: BTreeSet::new(),
    };
    let json = serde_json::to_string(&definition).expect("serialize");
    let decoded: AgentDefinition = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded.agent_id, definition.agent_id);
    assert_eq!(decoded.allowed_tool_requests, definition.allowed_tool_requests);
}

#[test]
fn tool_spec_roundtrips() {
    let spec = ToolSpec {
        id: ToolId::new("fs.write_file"),
        version: "1.0.0".to_string(),
        side_effect: SideEffectClass::Write,
        required_scopes: BTreeSet::new(),
        connector: "local_fs".to_string(),
        input_schema: serde_json::json!({"type": "object"}),
        output_schema: serde_json::json!({"type": "object"}),
        description: "writes a file to the sandbox".to_string(),
    };
    let json = serde_json::to_string(&spec).expect("serialize");
    let decoded: ToolSpec = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded.id, spec.id);
    assert!(decoded.requires_approval());
}

#[test]
fn pattern_record_roundtrips() {
    let pattern = PatternRecord {
        id: PatternId::new("pattern-1"),
        pattern_type: "retry_storm".to_string(),
        trigger_signature: "tool=fs.read_file status=timeout".to_string(),
        recommended_action: "back off and retry".to_string(),
        confidence: 0.6,
        evidence_ids: vec![EventId::new("e1")],
        created_at: Timestamp::Logical(1),
        last_strengthened_at: None,
    };
    roundtrips(&pattern);
}

#[test]
fn write_signals_roundtrips() {
    let signals = WriteSignals {
        progress_delta: 0.2,
        conflict_level: ConflictLevel::None,
        source_quality: 0.7,
        alignment_score: 0.8,
        blast_radius: BlastRadius::Local,
    };
    let json = serde_json::to_string(&signals).expect("serialize");
    let decoded: WriteSignals = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded.conflict_level, signals.conflict_level);
    assert_eq!(decoded.blast_radius, signals.blast_radius);
}

#[test]
fn event_map_placeholder_keeps_keys_sorted() {
    let mut payload: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    payload.insert("reason".to_string(), serde_json::json!("ok"));
    let json = serde_json::to_string(&payload).expect("serialize");
    assert_eq!(json, r#"{"reason":"ok"}"#);
}

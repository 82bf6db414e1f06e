// agent-kernel-store/src/memory_store.rs
// ============================================================================
// Module: Agent Kernel In-Memory Store
// Description: A non-durable PersistenceSink for tests and embedders that do
// not need disk durability.
// Purpose: Provide a zero-configuration persistence sink with the same
// append-order guarantees as FileStore, without touching the filesystem.
// Dependencies: agent_kernel_core::interfaces
// ============================================================================

//! ## Overview
//! `InMemoryStore` buffers every appended event and audit record in
//! process memory. It never fails: there is no I/O to fail on, so its
//! [`agent_kernel_core::interfaces::PersistenceSink`] implementation always
//! returns `Ok`. Intended for unit tests and embedders that accept losing
//! the trace on process exit.

use agent_kernel_core::AuditEvent;
use agent_kernel_core::Event;
use agent_kernel_core::interfaces::PersistenceError;
use agent_kernel_core::interfaces::PersistenceSink;

/// A non-durable, append-order-preserving persistence sink.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    /// Every event appended so far, in append order.
    events: Vec<Event>,
    /// Every audit record appended so far, in append order.
    audits: Vec<AuditEvent>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event appended so far, in append order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns every audit record appended so far, in append order.
    #[must_use]
    pub fn audits(&self) -> &[AuditEvent] {
        &self.audits
    }
}

impl PersistenceSink for InMemoryStore {
    fn append_event(&mut self, event: &Event) -> Result<(), PersistenceError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn append_audit(&mut self, event: &AuditEvent) -> Result<(), PersistenceError> {
        self.audits.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test-only assertions")]
mod tests {
    use agent_kernel_core::AuditDecision;
    use agent_kernel_core::AuditId;
    use agent_kernel_core::EventId;
    use agent_kernel_core::RequestId;
    use agent_kernel_core::Timestamp;
    use agent_kernel_core::ToolId;
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn appends_preserve_order_and_never_fail() {
        let mut store = InMemoryStore::new();
        store
            .append_event(&Event {
                id: EventId::new("e1"),
                event_type: "gate_attempt".to_string(),
                timestamp: Timestamp::Logical(1),
                payload: BTreeMap::new(),
                refs: vec![],
                problem_id: None,
                session_id: None,
            })
            .unwrap();
        store
            .append_audit(&AuditEvent {
                id: AuditId::new("a1"),
                timestamp: Timestamp::Logical(1),
                decision: AuditDecision::Allow,
                tool_id: ToolId::new("fs.read_file"),
                request_id: RequestId::new("r1"),
                reason: "within policy".to_string(),
                lane_id: None,
                agent_id: None,
                turn_id: 1,
                obligations: vec![],
                emotional_signals: BTreeMap::new(),
            })
            .unwrap();

        assert_eq!(store.events().len(), 1);
        assert_eq!(store.audits().len(), 1);
        assert_eq!(store.audits()[0].decision, AuditDecision::Allow);
    }
}

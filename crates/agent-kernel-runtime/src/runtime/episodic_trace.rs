// agent-kernel-runtime/src/runtime/episodic_trace.rs
// ============================================================================
// Module: Episodic Trace
// Description: Append-only structured event log; the kernel's primary audit
// record.
// Purpose: Implement append/log/query/get/get_recent/since per spec.md
// §4.12.
// Dependencies: agent_kernel_core::{Event, EventId, SessionId, ProblemId,
// Timestamp}, agent_kernel_core::interfaces::PersistenceSink
// ============================================================================

//! ## Overview
//! Every gate attempt, write admission or denial, tool execution, and
//! firewall rejection is recorded here. The trace never reads wall-clock
//! time; callers supply a [`Timestamp`] explicitly, keeping replay
//! deterministic. When a [`PersistenceSink`] is supplied at construction,
//! every append is also durably flushed, matching spec.md §5's "flushes to
//! persistent storage after each append" guarantee; without one the trace
//! is a pure in-memory index, as used by most tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use agent_kernel_core::Event;
use agent_kernel_core::EventId;
use agent_kernel_core::ProblemId;
use agent_kernel_core::SessionId;
use agent_kernel_core::Timestamp;
use agent_kernel_core::interfaces::PersistenceError;
use agent_kernel_core::interfaces::PersistenceSink;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Episodic Trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The configured persistence sink failed to durably record the event.
    #[error("failed to persist episodic event: {0}")]
    Persistence(#[from] PersistenceError),
}

// ============================================================================
// SECTION: Episodic Trace
// ============================================================================

/// Append-only event log, replayed into an in-memory index keyed by id.
pub struct EpisodicTrace {
    /// Events keyed by id, for O(log n) point lookup.
    by_id: BTreeMap<EventId, Event>,
    /// Ids in append order; within the same timestamp, append order breaks
    /// ties, per spec.md §5.
    order: Vec<EventId>,
    /// Session auto-assigned to events appended with no `session_id` set.
    session_id: Option<SessionId>,
    /// Monotonic counter backing generated event ids.
    next_sequence: u64,
    /// Optional durable sink every append is also flushed to.
    sink: Option<Box<dyn PersistenceSink>>,
}

impl EpisodicTrace {
    /// Creates an empty, in-memory-only trace for the given session.
    #[must_use]
    pub fn new(session_id: Option<SessionId>) -> Self {
        Self {
            by_id: BTreeMap::new(),
            order: Vec::new(),
            session_id,
            next_sequence: 0,
            sink: None,
        }
    }

    /// Creates a trace that also durably flushes every append to `sink`.
    #[must_use]
    pub fn with_sink(session_id: Option<SessionId>, sink: Box<dyn PersistenceSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(session_id)
        }
    }

    /// Generates the next deterministic event id.
    fn next_id(&mut self) -> EventId {
        let id = EventId::new(format!("ev-{:08}", self.next_sequence));
        self.next_sequence += 1;
        id
    }

    /// Appends a fully constructed event, auto-assigning `session_id` when
    /// unset, and flushing to the configured sink if any.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Persistence`] when the configured sink fails
    /// to durably record the event.
    pub fn append(&mut self, mut event: Event) -> Result<EventId, TraceError> {
        if event.session_id.is_none() {
            event.session_id.clone_from(&self.session_id);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.append_event(&event)?;
        }
        let id = event.id.clone();
        self.by_id.insert(id.clone(), event);
        self.order.push(id.clone());
        Ok(id)
    }

    /// Builds and appends an event from its constituent fields, generating
    /// a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Persistence`] when the configured sink fails
    /// to durably record the event.
    pub fn log(
        &mut self,
        event_type: impl Into<String>,
        payload: BTreeMap<String, Value>,
        problem_id: Option<ProblemId>,
        refs: Vec<EventId>,
        at: Timestamp,
    ) -> Result<EventId, TraceError> {
        let id = self.next_id();
        self.append(Event {
            id,
            event_type: event_type.into(),
            timestamp: at,
            payload,
            refs,
            problem_id,
            session_id: None,
        })
    }

    /// Looks up a single event by id.
    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.by_id.get(id)
    }

    /// Returns the `n` most recently appended events, most recent first.
    #[must_use]
    pub fn get_recent(&self, n: usize) -> Vec<&Event> {
        self.order
            .iter()
            .rev()
            .take(n)
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }

    /// Returns every event with `timestamp > cutoff`, oldest first.
    #[must_use]
    pub fn since(&self, cutoff: Timestamp) -> Vec<&Event> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|event| event.timestamp > cutoff)
            .collect()
    }

    /// Queries events by optional filters, returning at most `limit` of the
    /// most recent matches (most recent first), per spec.md §4.12.
    #[must_use]
    pub fn query(
        &self,
        event_type: Option<&str>,
        problem_id: Option<&ProblemId>,
        start: Option<Timestamp>,
        limit: Option<usize>,
    ) -> Vec<&Event> {
        let mut matches: Vec<&Event> = self
            .order
            .iter()
            .rev()
            .filter_map(|id| self.by_id.get(id))
            .filter(|event| event_type.is_none_or(|candidate| event.is_type(candidate)))
            .filter(|event| problem_id.is_none_or(|expected| event.problem_id.as_ref() == Some(expected)))
            .filter(|event| start.is_none_or(|lower_bound| event.timestamp >= lower_bound))
            .collect();
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Number of events currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true when the trace holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use super::*;

    #[test]
    fn log_assigns_deterministic_ids_and_session() {
        let mut trace = EpisodicTrace::new(Some(SessionId::new("s1")));
        let id = trace.log("gate_attempt", BTreeMap::new(), None, vec![], Timestamp::Logical(1)).expect("log");
        let event = trace.get(&id).expect("event present");
        assert_eq!(event.session_id, Some(SessionId::new("s1")));
    }

    #[test]
    fn get_recent_returns_most_recent_first() {
        let mut trace = EpisodicTrace::new(None);
        trace.log("a", BTreeMap::new(), None, vec![], Timestamp::Logical(1)).expect("log a");
        trace.log("b", BTreeMap::new(), None, vec![], Timestamp::Logical(2)).expect("log b");
        let recent = trace.get_recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_type, "b");
    }

    #[test]
    fn query_filters_by_type_and_respects_limit() {
        let mut trace = EpisodicTrace::new(None);
        trace.log("write_completed", BTreeMap::new(), None, vec![], Timestamp::Logical(1)).expect("log 1");
        trace.log("write_denied", BTreeMap::new(), None, vec![], Timestamp::Logical(2)).expect("log 2");
        trace.log("write_completed", BTreeMap::new(), None, vec![], Timestamp::Logical(3)).expect("log 3");
        let results = trace.query(Some("write_completed"), None, None, Some(1));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].timestamp, Timestamp::Logical(3));
    }

    #[test]
    fn since_excludes_events_at_or_before_cutoff() {
        let mut trace = EpisodicTrace::new(None);
        trace.log("a", BTreeMap::new(), None, vec![], Timestamp::Logical(1)).expect("log a");
        trace.log("b", BTreeMap::new(), None, vec![], Timestamp::Logical(2)).expect("log b");
        let results = trace.since(Timestamp::Logical(1));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_type, "b");
    }
}

// agent-kernel-runtime/src/runtime/lane_store.rs
// ============================================================================
// Module: Lane Store
// Description: Tracks workstreams (lanes) and enforces the single-active
// invariant.
// Purpose: Implement create/activate/pause/resume/complete/remove and
// expired-lease detection, per spec.md §4.9.
// Dependencies: agent_kernel_core::{Lane, LaneLease, LaneBudgets,
// LaneSnapshot, LaneStatus, LeaseMode}
// ============================================================================

//! ## Overview
//! At most one lane is `Active`. Activating a lane requires any existing
//! active lane to already be paused; `create` silently starts a new lane
//! Paused when one is already Active, rather than failing the caller.
//!
//! The kernel never reads wall-clock time (see
//! [`agent_kernel_core::Timestamp`]'s module overview), so lease duration is
//! taken here as an explicit `expires_at` rather than a literal hour count:
//! the caller computes the deadline from its own clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use agent_kernel_core::Lane;
use agent_kernel_core::LaneBudgets;
use agent_kernel_core::LaneId;
use agent_kernel_core::LaneLease;
use agent_kernel_core::LaneSnapshot;
use agent_kernel_core::LaneStatus;
use agent_kernel_core::LeaseMode;
use agent_kernel_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the Lane Store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaneStoreError {
    /// `create` was attempted while the paused-lane cap was already reached.
    #[error("paused lane cap reached: {cap}")]
    PausedCapReached {
        /// The configured cap.
        cap: usize,
    },
    /// No lane exists with the given id.
    #[error("no lane with id {0}")]
    NotFound(LaneId),
    /// `activate` was attempted while a different lane is still Active.
    #[error("lane {active} is active; pause it before activating {requested}")]
    MustPauseActiveFirst {
        /// The lane currently Active.
        active: LaneId,
        /// The lane the caller tried to activate.
        requested: LaneId,
    },
    /// `pause` was attempted with an empty bookmark.
    #[error("pausing a lane requires a non-empty bookmark")]
    BookmarkRequired,
    /// `pause` was attempted on a lane that is not Active.
    #[error("lane {0} is not active")]
    NotActive(LaneId),
    /// `remove` was attempted on a lane that is not Completed.
    #[error("lane {0} is not completed")]
    NotCompleted(LaneId),
}

// ============================================================================
// SECTION: Lane Store Config
// ============================================================================

/// Default for [`LaneStoreConfig::max_paused_lanes`], per spec.md §6.
const fn default_max_paused_lanes() -> usize {
    5
}

/// Tunable limits for the Lane Store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LaneStoreConfig {
    /// Maximum number of simultaneously Paused lanes.
    #[serde(default = "default_max_paused_lanes")]
    pub max_paused_lanes: usize,
}

impl Default for LaneStoreConfig {
    fn default() -> Self {
        Self {
            max_paused_lanes: default_max_paused_lanes(),
        }
    }
}

// ============================================================================
// SECTION: Lane Store
// ============================================================================

/// Tracks every workstream (lane) in a session.
#[derive(Debug, Clone, Default)]
pub struct LaneStore {
    /// Lanes keyed by id.
    lanes: BTreeMap<LaneId, Lane>,
    /// Tunable limits.
    config: LaneStoreConfig,
}

impl LaneStore {
    /// Creates an empty store with the given config.
    #[must_use]
    pub fn new(config: LaneStoreConfig) -> Self {
        Self {
            lanes: BTreeMap::new(),
            config,
        }
    }

    /// Returns the active lane, if any.
    #[must_use]
    pub fn active_lane(&self) -> Option<&Lane> {
        self.lanes.values().find(|lane| lane.is_active())
    }

    /// Returns the lane with the given id, if any.
    #[must_use]
    pub fn get(&self, id: &LaneId) -> Option<&Lane> {
        self.lanes.get(id)
    }

    /// Number of lanes currently Paused.
    fn paused_count(&self) -> usize {
        self.lanes.values().filter(|lane| matches!(lane.status, LaneStatus::Paused)).count()
    }

    /// Creates a new lane. When another lane is already Active, the new
    /// lane starts Paused regardless of `auto_activate`; `create` fails when
    /// that would exceed the paused-lane cap.
    pub fn create(
        &mut self,
        lane_id: LaneId,
        kind: impl Into<String>,
        goal: impl Into<String>,
        mode: LeaseMode,
        expires_at: Timestamp,
        policy: Value,
        budgets: LaneBudgets,
        auto_activate: bool,
    ) -> Result<&Lane, LaneStoreError> {
        let starts_active = auto_activate && self.active_lane().is_none();
        if !starts_active && self.paused_count() >= self.config.max_paused_lanes {
            return Err(LaneStoreError::PausedCapReached {
                cap: self.config.max_paused_lanes,
            });
        }

        let lane = Lane {
            lane_id: lane_id.clone(),
            kind: kind.into(),
            status: if starts_active { LaneStatus::Active } else { LaneStatus::Paused },
            lease: LaneLease {
                mode,
                goal: goal.into(),
                expires_at,
            },
            policy,
            budgets,
            snapshot: LaneSnapshot::default(),
        };
        self.lanes.insert(lane_id.clone(), lane);
        Ok(self.lanes.get(&lane_id).unwrap_or_else(|| unreachable!("lane just inserted")))
    }

    /// Activates a Paused lane. Fails if a different lane is still Active.
    pub fn activate(&mut self, id: &LaneId) -> Result<&Lane, LaneStoreError> {
        if let Some(active) = self.active_lane() {
            if active.lane_id != *id {
                return Err(LaneStoreError::MustPauseActiveFirst {
                    active: active.lane_id.clone(),
                    requested: id.clone(),
                });
            }
        }
        let lane = self.lanes.get_mut(id).ok_or_else(|| LaneStoreError::NotFound(id.clone()))?;
        lane.status = LaneStatus::Active;
        Ok(&*lane)
    }

    /// Pauses the given Active lane, recording its resumable snapshot.
    /// Requires a non-empty bookmark.
    pub fn pause(
        &mut self,
        id: &LaneId,
        bookmark: impl Into<String>,
        next_steps: Vec<String>,
        open_questions: Vec<String>,
    ) -> Result<&Lane, LaneStoreError> {
        let bookmark = bookmark.into();
        if bookmark.is_empty() {
            return Err(LaneStoreError::BookmarkRequired);
        }
        let lane = self.lanes.get_mut(id).ok_or_else(|| LaneStoreError::NotFound(id.clone()))?;
        if !lane.is_active() {
            return Err(LaneStoreError::NotActive(id.clone()));
        }
        lane.status = LaneStatus::Paused;
        lane.snapshot = LaneSnapshot {
            bookmark,
            next_steps,
            open_questions,
        };
        Ok(&*lane)
    }

    /// Resumes a Paused lane, restoring its bookmark and next steps as
    /// obligations for the caller. Subject to the same single-active rule
    /// as [`Self::activate`].
    pub fn resume(&mut self, id: &LaneId) -> Result<&Lane, LaneStoreError> {
        self.activate(id)
    }

    /// Marks a lane Completed. `summary`, when given, replaces the lane's
    /// bookmark.
    pub fn complete(&mut self, id: &LaneId, summary: Option<String>) -> Result<&Lane, LaneStoreError> {
        let lane = self.lanes.get_mut(id).ok_or_else(|| LaneStoreError::NotFound(id.clone()))?;
        lane.status = LaneStatus::Completed;
        if let Some(summary) = summary {
            lane.snapshot.bookmark = summary;
        }
        Ok(&*lane)
    }

    /// Removes a Completed lane from the store.
    pub fn remove(&mut self, id: &LaneId) -> Result<(), LaneStoreError> {
        match self.lanes.get(id) {
            Some(lane) if matches!(lane.status, LaneStatus::Completed) => {
                self.lanes.remove(id);
                Ok(())
            },
            Some(_) => Err(LaneStoreError::NotCompleted(id.clone())),
            None => Err(LaneStoreError::NotFound(id.clone())),
        }
    }

    /// Renews a lane's lease to a new expiry, without changing its status.
    pub fn renew_lease(&mut self, id: &LaneId, expires_at: Timestamp) -> Result<&Lane, LaneStoreError> {
        let lane = self.lanes.get_mut(id).ok_or_else(|| LaneStoreError::NotFound(id.clone()))?;
        lane.lease.expires_at = expires_at;
        Ok(&*lane)
    }

    /// Returns every non-completed lane whose lease has expired as of `now`.
    /// An expired lease never auto-expires the lane; surfacing it here is
    /// meant to trigger the Evaluation gate.
    #[must_use]
    pub fn check_expired_leases(&self, now: Timestamp) -> Vec<&Lane> {
        self.lanes
            .values()
            .filter(|lane| !matches!(lane.status, LaneStatus::Completed) && lane.lease_expired(now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use serde_json::json;

    use super::*;

    fn budgets() -> LaneBudgets {
        LaneBudgets {
            max_tool_requests_per_turn: 5,
        }
    }

    #[test]
    fn second_lane_starts_paused_when_one_is_active() {
        let mut store = LaneStore::new(LaneStoreConfig::default());
        store
            .create(
                LaneId::new("l1"),
                "research",
                "investigate",
                LeaseMode::Execution,
                Timestamp::Logical(10),
                json!({}),
                budgets(),
                true,
            )
            .expect("create l1");
        store
            .create(
                LaneId::new("l2"),
                "writing",
                "draft",
                LeaseMode::Execution,
                Timestamp::Logical(10),
                json!({}),
                budgets(),
                true,
            )
            .expect("create l2");
        assert_eq!(store.get(&LaneId::new("l2")).expect("l2").status, LaneStatus::Paused);
    }

    #[test]
    fn activate_fails_while_another_lane_is_active() {
        let mut store = LaneStore::new(LaneStoreConfig::default());
        store
            .create(LaneId::new("l1"), "research", "investigate", LeaseMode::Execution, Timestamp::Logical(10), json!({}), budgets(), true)
            .expect("create l1");
        store
            .create(LaneId::new("l2"), "writing", "draft", LeaseMode::Execution, Timestamp::Logical(10), json!({}), budgets(), true)
            .expect("create l2");
        let result = store.activate(&LaneId::new("l2"));
        assert!(result.is_err());
    }

    #[test]
    fn pause_requires_nonempty_bookmark() {
        let mut store = LaneStore::new(LaneStoreConfig::default());
        store
            .create(LaneId::new("l1"), "research", "investigate", LeaseMode::Execution, Timestamp::Logical(10), json!({}), budgets(), true)
            .expect("create l1");
        let result = store.pause(&LaneId::new("l1"), "", vec![], vec![]);
        assert_eq!(result, Err(LaneStoreError::BookmarkRequired));
    }

    #[test]
    fn pause_then_activate_second_lane_succeeds() {
        let mut store = LaneStore::new(LaneStoreConfig::default());
        store
            .create(LaneId::new("l1"), "research", "investigate", LeaseMode::Execution, Timestamp::Logical(10), json!({}), budgets(), true)
            .expect("create l1");
        store
            .create(LaneId::new("l2"), "writing", "draft", LeaseMode::Execution, Timestamp::Logical(10), json!({}), budgets(), true)
            .expect("create l2");
        store.pause(&LaneId::new("l1"), "stopped at step 2", vec![], vec![]).expect("pause l1");
        let activated = store.activate(&LaneId::new("l2")).expect("activate l2");
        assert!(activated.is_active());
    }

    #[test]
    fn check_expired_leases_surfaces_without_mutating_status() {
        let mut store = LaneStore::new(LaneStoreConfig::default());
        store
            .create(LaneId::new("l1"), "research", "investigate", LeaseMode::Execution, Timestamp::Logical(5), json!({}), budgets(), true)
            .expect("create l1");
        let expired = store.check_expired_leases(Timestamp::Logical(10));
        assert_eq!(expired.len(), 1);
        assert!(store.get(&LaneId::new("l1")).expect("l1").is_active());
    }

    #[test]
    fn remove_requires_completed_status() {
        let mut store = LaneStore::new(LaneStoreConfig::default());
        store
            .create(LaneId::new("l1"), "research", "investigate", LeaseMode::Execution, Timestamp::Logical(10), json!({}), budgets(), true)
            .expect("create l1");
        assert!(store.remove(&LaneId::new("l1")).is_err());
        store.complete(&LaneId::new("l1"), None).expect("complete l1");
        assert!(store.remove(&LaneId::new("l1")).is_ok());
    }
}

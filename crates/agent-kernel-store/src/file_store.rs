// agent-kernel-store/src/file_store.rs
// ============================================================================
// Module: Agent Kernel File Store
// Description: File-backed persistence for the episodic trace, audit trail,
// and the four memory-tier snapshots, per spec.md §6's persisted state
// layout.
// Purpose: Implement PersistenceSink and the snapshot read/write surface the
// turn driver and its components need to survive a restart.
// Dependencies: agent_kernel_core::interfaces, serde, serde_json
// ============================================================================

//! ## Overview
//! `FileStore` lays out one directory per deployment, holding exactly the
//! files spec.md §6 names: `episodic.jsonl` and `gate_log.jsonl` as
//! append-only line-delimited JSON, and `shared.json`, `history.json`,
//! `semantic.json`, `lanes.json`, `commitment.json` as whole-file snapshots
//! replaced atomically on every write. Snapshot writes never leave a
//! half-written file on disk: each is written to a sibling temp path first,
//! `fsync`'d, then renamed over the destination.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use agent_kernel_core::AuditEvent;
use agent_kernel_core::CommitmentLease;
use agent_kernel_core::Event;
use agent_kernel_core::Lane;
use agent_kernel_core::LaneId;
use agent_kernel_core::PatternId;
use agent_kernel_core::PatternRecord;
use agent_kernel_core::SharedEntry;
use agent_kernel_core::interfaces::PersistenceError;
use agent_kernel_core::interfaces::PersistenceSink;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::error::map_persistence_err;

// ============================================================================
// SECTION: File Names
// ============================================================================

/// Append-only episodic event log.
const EPISODIC_FILE: &str = "episodic.jsonl";
/// Append-only audit decision log.
const GATE_LOG_FILE: &str = "gate_log.jsonl";
/// Canonical shared-memory snapshot, latest version per key.
const SHARED_FILE: &str = "shared.json";
/// Bounded prior-version history for shared-memory entries.
const HISTORY_FILE: &str = "history.json";
/// Semantic-tier pattern snapshot.
const SEMANTIC_FILE: &str = "semantic.json";
/// Lane store snapshot.
const LANES_FILE: &str = "lanes.json";
/// Commitment lease snapshot.
const COMMITMENT_FILE: &str = "commitment.json";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding every persisted file. Created if absent.
    pub root: PathBuf,
}

impl FileStoreConfig {
    /// Creates a config rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

// ============================================================================
// SECTION: Lanes Snapshot
// ============================================================================

/// Whole-file shape of `lanes.json`, per spec.md §6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanesSnapshot {
    /// The single active lane, if any.
    pub active_lane_id: Option<LaneId>,
    /// Every known lane, keyed by id.
    pub lanes: BTreeMap<LaneId, Lane>,
}

// ============================================================================
// SECTION: File Store
// ============================================================================

/// File-backed implementation of the persistence ports and memory-tier
/// snapshot surface.
#[derive(Debug)]
pub struct FileStore {
    /// Directory holding every persisted file.
    root: PathBuf,
    /// Monotonic counter used to generate unique temp-file suffixes.
    tmp_sequence: AtomicU64,
}

impl FileStore {
    /// Opens (creating if absent) a file store rooted at `config.root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the root directory cannot be created.
    pub fn open(config: FileStoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { root: config.root, tmp_sequence: AtomicU64::new(0) })
    }

    /// Returns the root directory this store persists to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Appends one JSON-encoded line to `filename`, creating it if absent.
    fn append_line(&self, filename: &str, value: &impl Serialize) -> Result<(), StoreError> {
        let line = serde_json::to_string(value)?;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(self.root.join(filename))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        Ok(())
    }

    /// Reads every line of `filename` as a JSON value, returning an empty
    /// vector when the file does not exist.
    fn read_lines<T: DeserializeOwned>(&self, filename: &str) -> Result<Vec<T>, StoreError> {
        let path = self.root.join(filename);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// Atomically replaces `filename`'s contents with `value`'s JSON
    /// encoding: write to a temp sibling, `fsync`, then rename over the
    /// destination. Cleans up the temp file on any failure.
    fn write_snapshot(&self, filename: &str, value: &impl Serialize) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(value)?;
        let sequence = self.tmp_sequence.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!("{filename}.tmp-{sequence}");
        let tmp_path = self.root.join(&tmp_name);
        let dest_path = self.root.join(filename);

        let write_result = (|| -> Result<(), StoreError> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp_path, &dest_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// Reads `filename` as a single JSON document, returning `T::default()`
    /// when the file does not exist.
    fn read_snapshot<T: DeserializeOwned + Default>(&self, filename: &str) -> Result<T, StoreError> {
        let path = self.root.join(filename);
        if !path.exists() {
            return Ok(T::default());
        }
        let contents = fs::read(path)?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Replaces the canonical shared-memory snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    pub fn save_shared(&self, entries: &BTreeMap<String, SharedEntry>) -> Result<(), StoreError> {
        self.write_snapshot(SHARED_FILE, entries)
    }

    /// Loads the canonical shared-memory snapshot, or an empty map if none
    /// has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the persisted snapshot cannot be parsed.
    pub fn load_shared(&self) -> Result<BTreeMap<String, SharedEntry>, StoreError> {
        self.read_snapshot(SHARED_FILE)
    }

    /// Replaces the bounded prior-version history for shared-memory
    /// entries, per spec.md §4.8's per-key history cap.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    pub fn save_history(&self, history: &BTreeMap<String, Vec<SharedEntry>>) -> Result<(), StoreError> {
        self.write_snapshot(HISTORY_FILE, history)
    }

    /// Loads the bounded prior-version history, or an empty map if none has
    /// been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the persisted snapshot cannot be parsed.
    pub fn load_history(&self) -> Result<BTreeMap<String, Vec<SharedEntry>>, StoreError> {
        self.read_snapshot(HISTORY_FILE)
    }

    /// Replaces the semantic-tier pattern snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    pub fn save_semantic(&self, patterns: &BTreeMap<PatternId, PatternRecord>) -> Result<(), StoreError> {
        self.write_snapshot(SEMANTIC_FILE, patterns)
    }

    /// Loads the semantic-tier pattern snapshot, or an empty map if none has
    /// been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the persisted snapshot cannot be parsed.
    pub fn load_semantic(&self) -> Result<BTreeMap<PatternId, PatternRecord>, StoreError> {
        self.read_snapshot(SEMANTIC_FILE)
    }

    /// Replaces the lane store snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    pub fn save_lanes(&self, snapshot: &LanesSnapshot) -> Result<(), StoreError> {
        self.write_snapshot(LANES_FILE, snapshot)
    }

    /// Loads the lane store snapshot, or an empty one if none has been
    /// persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the persisted snapshot cannot be parsed.
    pub fn load_lanes(&self) -> Result<LanesSnapshot, StoreError> {
        self.read_snapshot(LANES_FILE)
    }

    /// Replaces the commitment lease snapshot. Pass `None` to persist that
    /// no lease is currently active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the snapshot cannot be written.
    pub fn save_commitment(&self, lease: &Option<CommitmentLease>) -> Result<(), StoreError> {
        self.write_snapshot(COMMITMENT_FILE, lease)
    }

    /// Loads the commitment lease snapshot, or `None` if none has been
    /// persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the persisted snapshot cannot be parsed.
    pub fn load_commitment(&self) -> Result<Option<CommitmentLease>, StoreError> {
        self.read_snapshot(COMMITMENT_FILE)
    }

    /// Loads every persisted episodic event, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the log cannot be parsed.
    pub fn load_events(&self) -> Result<Vec<Event>, StoreError> {
        self.read_lines(EPISODIC_FILE)
    }

    /// Loads every persisted audit record, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the log cannot be parsed.
    pub fn load_audits(&self) -> Result<Vec<AuditEvent>, StoreError> {
        self.read_lines(GATE_LOG_FILE)
    }
}

impl PersistenceSink for FileStore {
    fn append_event(&mut self, event: &Event) -> Result<(), PersistenceError> {
        self.append_line(EPISODIC_FILE, event).map_err(map_persistence_err)
    }

    fn append_audit(&mut self, event: &AuditEvent) -> Result<(), PersistenceError> {
        self.append_line(GATE_LOG_FILE, event).map_err(map_persistence_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test-only assertions")]
mod tests {
    use agent_kernel_core::EventId;
    use agent_kernel_core::Timestamp;

    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(FileStoreConfig::new(dir.path())).unwrap();
        (dir, store)
    }

    fn sample_event(id: &str) -> Event {
        Event {
            id: EventId::new(id),
            event_type: "gate_attempt".to_string(),
            timestamp: Timestamp::Logical(1),
            payload: BTreeMap::new(),
            refs: vec![],
            problem_id: None,
            session_id: None,
        }
    }

    #[test]
    fn appended_events_survive_a_reopen() {
        let (dir, mut store) = store();
        store.append_event(&sample_event("e1")).unwrap();
        store.append_event(&sample_event("e2")).unwrap();
        drop(store);

        let reopened = FileStore::open(FileStoreConfig::new(dir.path())).unwrap();
        let events = reopened.load_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, EventId::new("e1"));
        assert_eq!(events[1].id, EventId::new("e2"));
    }

    #[test]
    fn shared_snapshot_round_trips() {
        let (_dir, store) = store();
        let mut entries = BTreeMap::new();
        entries.insert(
            "budget".to_string(),
            SharedEntry {
                key: "budget".to_string(),
                value: serde_json::json!(42),
                version: 3,
                updated_at: Timestamp::Logical(7),
            },
        );
        store.save_shared(&entries).unwrap();
        let loaded = store.load_shared().unwrap();
        assert_eq!(loaded.get("budget").unwrap().version, 3);
    }

    #[test]
    fn missing_snapshot_loads_as_default() {
        let (_dir, store) = store();
        assert!(store.load_lanes().unwrap().lanes.is_empty());
        assert!(store.load_commitment().unwrap().is_none());
    }

    #[test]
    fn snapshot_write_leaves_no_temp_file_behind() {
        let (dir, store) = store();
        store.save_commitment(&None).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

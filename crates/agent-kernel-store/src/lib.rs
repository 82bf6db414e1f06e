// agent-kernel-store/src/lib.rs
// ============================================================================
// Module: Agent Kernel Store
// Description: File-backed and in-memory implementations of the
// PersistenceSink port, plus the memory-tier snapshot surface.
// Purpose: Provide the durable (and non-durable) persistence layer named in
// spec.md §6's persisted state layout.
// Dependencies: agent_kernel_core::interfaces, serde_json
// ============================================================================

//! ## Overview
//! `agent-kernel-store` supplies two [`agent_kernel_core::interfaces::PersistenceSink`]
//! implementations: [`FileStore`], which lays out the durable files spec.md
//! §6 names under a configured root directory, and [`InMemoryStore`], a
//! non-durable buffer for tests and embedders that accept losing the trace
//! on exit. Neither type makes authorization decisions; both only decide
//! how an already-accepted record is made durable.

pub mod error;
pub mod file_store;
pub mod memory_store;

pub use error::StoreError;
pub use error::map_persistence_err;
pub use file_store::FileStore;
pub use file_store::FileStoreConfig;
pub use file_store::LanesSnapshot;
pub use memory_store::InMemoryStore;

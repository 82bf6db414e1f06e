// agent-kernel-store/src/error.rs
// ============================================================================
// Module: Agent Kernel Store Errors
// Description: Failure modes for file-backed and in-memory persistence.
// Purpose: Define StoreError and its mapping onto the core PersistenceError.
// Dependencies: agent_kernel_core::interfaces::PersistenceError, thiserror
// ============================================================================

//! ## Overview
//! `StoreError` is the store crate's own error enum, following the
//! per-component convention named in spec.md's ambient stack: every fallible
//! operation gets a `thiserror`-derived enum scoped to its component. It is
//! distinct from [`agent_kernel_core::interfaces::PersistenceError`] because
//! the store has failure modes (snapshot file layout, path construction) the
//! port-level error does not need to name; [`map_persistence_err`] collapses
//! it onto the port's error when implementing [`agent_kernel_core::interfaces::PersistenceSink`].

use agent_kernel_core::interfaces::PersistenceError;
use thiserror::Error;

/// Errors raised by [`crate::file_store::FileStore`] and its snapshot helpers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("store io error: {0}")]
    Io(String),
    /// A value failed to serialize or deserialize as JSON.
    #[error("store serialization error: {0}")]
    Serialization(String),
    /// Stored data was structurally present but did not match the expected
    /// shape (for example, a snapshot file truncated mid-write outside of
    /// this crate's control).
    #[error("store integrity error: {0}")]
    Integrity(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Maps a [`StoreError`] onto the backend-agnostic
/// [`PersistenceError`] expected by the [`agent_kernel_core::interfaces::PersistenceSink`] port.
#[must_use]
pub fn map_persistence_err(err: StoreError) -> PersistenceError {
    match err {
        StoreError::Io(detail) => PersistenceError::Io(detail),
        StoreError::Serialization(detail) => PersistenceError::Serialization(detail),
        StoreError::Integrity(detail) => PersistenceError::Integrity(detail),
    }
}

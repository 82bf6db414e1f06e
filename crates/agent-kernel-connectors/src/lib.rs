// agent-kernel-connectors/src/lib.rs
// ============================================================================
// Module: Agent Kernel Connectors
// Description: Default sandboxed connector implementations.
// Purpose: Implement the `Connector` port's filesystem surface, per spec.md
// §6.
// Dependencies: agent_kernel_core::interfaces::Connector, cap-std,
// cap-primitives
// ============================================================================

//! ## Overview
//! `agent-kernel-connectors` ships the one connector every deployment needs:
//! a capability-sandboxed local filesystem driver. It is never consulted for
//! *authorization* — by the time the Tool Runtime reaches a connector, the
//! Policy Decision Point has already approved the call (spec.md §4.7 step
//! 6). A connector only decides whether it *can* perform the call: path
//! traversal, symlink escapes, and oversized payloads are rejected here as
//! [`agent_kernel_core::interfaces::ConnectorError::SandboxViolation`] or
//! [`ConnectorError::Backend`].

pub mod local_fs;

pub use local_fs::LocalFsConfig;
pub use local_fs::LocalFsConnector;

// agent-kernel-config/src/lib.rs
// ============================================================================
// Module: Agent Kernel Config
// Description: Declarative configuration for every tunable the governance
// kernel exposes, per spec.md §6.
// Purpose: Expose KernelConfig, its TOML loader, and its validation.
// Dependencies: agent_kernel_core, agent_kernel_runtime, serde, toml
// ============================================================================

//! ## Overview
//! `agent-kernel-config` is the single place every deployment-tunable
//! knob named in spec.md §6 is declared, defaulted, and validated, in the
//! style of `decision-gate-config`. It depends on `agent-kernel-core` and
//! `agent-kernel-runtime` only for their already-`Serialize`/`Deserialize`
//! config types; it contains no decision logic of its own.

pub mod config;

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::KernelConfig;
pub use config::MAX_CONFIG_FILE_SIZE;

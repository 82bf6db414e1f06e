// agent-kernel-config/src/config.rs
// ============================================================================
// Module: Agent Kernel Configuration
// Description: Aggregates every component's tunable config, plus the knobs
// spec.md §6 names that no single component owns, into one loadable struct.
// Purpose: Provide strict, fail-closed TOML loading in the style of
// decision-gate-config.
// Dependencies: agent_kernel_core, agent_kernel_runtime, serde, toml
// ============================================================================

//! ## Overview
//! `KernelConfig` collects every knob enumerated in spec.md §6 into one
//! `serde`+`toml`-loadable struct: each kernel component's own config type
//! (already `Serialize`/`Deserialize` in `agent-kernel-runtime`) is embedded
//! as a named section, defaulting independently when a section is absent
//! from the source TOML, in the style of `decision-gate-config`'s
//! per-section `#[serde(default)]` fields. A handful of knobs spec.md §6
//! names are not owned by any single runtime component — lease durations
//! and TTLs, which the kernel never computes itself because it never reads
//! wall-clock time (see [`agent_kernel_core::Timestamp`]) — those are
//! plain fields here for the embedder to read when computing an explicit
//! deadline to pass into the relevant component call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use agent_kernel_core::GateRequestName;
use agent_kernel_runtime::FirewallConfig;
use agent_kernel_runtime::GateControllerConfig;
use agent_kernel_runtime::LaneStoreConfig;
use agent_kernel_runtime::OrchestratorConfig;
use agent_kernel_runtime::TurnDriverConfig;
use agent_kernel_runtime::WriteGateConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "agent-kernel.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "AGENT_KERNEL_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default for [`KernelConfig::default_delegation_lease_turns`], per spec.md
/// §6.
const fn default_delegation_lease_turns() -> u32 {
    10
}

/// Default for [`KernelConfig::default_lane_lease_hours`], per spec.md §6.
const fn default_lane_lease_hours() -> u32 {
    4
}

/// Default for [`KernelConfig::default_working_ttl_hours`], per spec.md §6.
const fn default_working_ttl_hours() -> u32 {
    2
}

/// Default for [`KernelConfig::protected_gate_requests`], mirroring
/// [`agent_kernel_core::default_protected_gate_requests`].
fn default_protected_gate_request_names() -> Vec<String> {
    agent_kernel_core::default_protected_gate_requests()
        .into_iter()
        .map(|name| name.as_str().to_string())
        .collect()
}

/// Default for [`KernelConfig::forbidden_claim_patterns`], mirroring the
/// firewall's built-in pattern list (see
/// `agent_kernel_runtime::runtime::firewall`).
fn default_forbidden_claim_patterns() -> Vec<String> {
    vec![
        "i have executed".to_string(),
        "i performed".to_string(),
        "i wrote to".to_string(),
        "i deleted".to_string(),
        "i modified".to_string(),
        "file saved".to_string(),
        "changes applied".to_string(),
    ]
}

// ============================================================================
// SECTION: Kernel Config
// ============================================================================

/// Every tunable knob named in spec.md §6, collected into one loadable
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Gate Controller tunables (emergency cooldown, commitment reset).
    #[serde(default)]
    pub gate_controller: GateControllerConfig,
    /// Packet Firewall tunables (proposal and tool-request caps).
    #[serde(default)]
    pub firewall: FirewallConfig,
    /// Orchestrator tunables (timeout, worker cap, panel size).
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Write Gate tunables (quality/alignment/blast-radius thresholds).
    #[serde(default)]
    pub write_gate: WriteGateConfig,
    /// Lane Store tunables (paused-lane cap).
    #[serde(default)]
    pub lane_store: LaneStoreConfig,
    /// Turn loop tunables (proposal priority order, panel concurrency).
    #[serde(default)]
    pub turn_driver: TurnDriverConfig,
    /// Default turn budget for a newly granted Delegation lease, absent an
    /// explicit override, per spec.md §6's "Default lease turns."
    #[serde(default = "default_delegation_lease_turns")]
    pub default_delegation_lease_turns: u32,
    /// Default lease duration, in hours, for a newly created Lane, per
    /// spec.md §6's "Lane Store: ... default lease hours."
    #[serde(default = "default_lane_lease_hours")]
    pub default_lane_lease_hours: u32,
    /// Default Working-tier entry TTL, in hours, per spec.md §6's "Memory
    /// Bus: default_ttl_hours."
    #[serde(default = "default_working_ttl_hours")]
    pub default_working_ttl_hours: u32,
    /// Gate-request names an agent may never request directly, per spec.md
    /// §6's "protected-gates (set)." Converted to
    /// [`GateRequestName`] via [`KernelConfig::protected_gate_requests`].
    #[serde(default = "default_protected_gate_request_names")]
    pub protected_gate_requests: Vec<String>,
    /// Side-effect claim substrings an agent packet must never contain, per
    /// spec.md §6's "forbidden-claim patterns." Surfaced for documentation
    /// and forward compatibility; the current `PacketFirewall` enforces its
    /// own built-in list rather than reading this field (see DESIGN.md).
    #[serde(default = "default_forbidden_claim_patterns")]
    pub forbidden_claim_patterns: Vec<String>,
    /// Modification time of the loaded source file, if loaded from disk.
    #[serde(skip)]
    pub source_modified_at: Option<std::time::SystemTime>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            gate_controller: GateControllerConfig::default(),
            firewall: FirewallConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            write_gate: WriteGateConfig::default(),
            lane_store: LaneStoreConfig::default(),
            turn_driver: TurnDriverConfig::default(),
            default_delegation_lease_turns: default_delegation_lease_turns(),
            default_lane_lease_hours: default_lane_lease_hours(),
            default_working_ttl_hours: default_working_ttl_hours(),
            protected_gate_requests: default_protected_gate_request_names(),
            forbidden_claim_patterns: default_forbidden_claim_patterns(),
            source_modified_at: None,
        }
    }
}

impl KernelConfig {
    /// Loads configuration from disk using the default resolution rules: an
    /// explicit `path`, else the `AGENT_KERNEL_CONFIG` environment variable,
    /// else `agent-kernel.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds the
    /// size limit, fails to parse, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() as u64 > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any threshold is outside its valid
    /// range, or a cap is zero where at least one is required.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("write_gate.min_source_quality", self.write_gate.min_source_quality),
            ("write_gate.min_alignment", self.write_gate.min_alignment),
            ("write_gate.blast_radius_threshold", self.write_gate.blast_radius_threshold),
            ("write_gate.semantic_min_source_quality", self.write_gate.semantic_min_source_quality),
            ("write_gate.semantic_min_alignment", self.write_gate.semantic_min_alignment),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{field} must be within [0.0, 1.0], got {value}")));
            }
        }
        if self.lane_store.max_paused_lanes == 0 {
            return Err(ConfigError::Invalid("lane_store.max_paused_lanes must be at least 1".to_string()));
        }
        if self.firewall.max_proposals_per_packet == 0 {
            return Err(ConfigError::Invalid("firewall.max_proposals_per_packet must be at least 1".to_string()));
        }
        if self.orchestrator.max_workers == 0 {
            return Err(ConfigError::Invalid("orchestrator.max_workers must be at least 1".to_string()));
        }
        if self.default_delegation_lease_turns == 0 {
            return Err(ConfigError::Invalid("default_delegation_lease_turns must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Returns [`KernelConfig::protected_gate_requests`] converted to the
    /// core identifier type, ready to pass into `PacketFirewall::new`.
    #[must_use]
    pub fn protected_gate_request_names(&self) -> Vec<GateRequestName> {
        self.protected_gate_requests.iter().map(String::as_str).map(GateRequestName::new).collect()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument, environment
/// variable, or default filename, in that order.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test-only assertions")]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_spec_named_values() {
        let config = KernelConfig::default();
        assert_eq!(config.gate_controller.emergency_cooldown_turns, 3);
        assert_eq!(config.firewall.max_proposals_per_packet, 10);
        assert_eq!(config.firewall.max_tool_requests, 5);
        assert!((config.write_gate.min_source_quality - 0.3).abs() < f64::EPSILON);
        assert!((config.write_gate.min_alignment - 0.4).abs() < f64::EPSILON);
        assert!((config.write_gate.blast_radius_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.lane_store.max_paused_lanes, 5);
        assert_eq!(config.default_working_ttl_hours, 2);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides_one_field_and_keeps_other_defaults() {
        let toml_source = "[firewall]\nmax_tool_requests = 9\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml_source.as_bytes()).unwrap();
        let config = KernelConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.firewall.max_tool_requests, 9);
        assert_eq!(config.firewall.max_proposals_per_packet, 10);
        assert_eq!(config.gate_controller.emergency_cooldown_turns, 3);
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = KernelConfig::default();
        config.write_gate.min_alignment = 1.5;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_paused_lane_cap_fails_validation() {
        let mut config = KernelConfig::default();
        config.lane_store.max_paused_lanes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn protected_gate_request_names_round_trip_as_core_identifiers() {
        let config = KernelConfig::default();
        let names = config.protected_gate_request_names();
        assert!(names.iter().any(|name| name.as_str() == "stance_override"));
    }
}

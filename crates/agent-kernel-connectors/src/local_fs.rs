// agent-kernel-connectors/src/local_fs.rs
// ============================================================================
// Module: Local Filesystem Connector
// Description: Capability-sandboxed driver for the `local_fs` connector
// name.
// Purpose: Implement read_file/write_file/list_directory/file_info per
// spec.md §6.
// Dependencies: agent_kernel_core::{ToolSpec, ToolId, SideEffectClass},
// agent_kernel_core::interfaces::{Connector, ConnectorError}, cap-std,
// cap-primitives
// ============================================================================

//! ## Overview
//! Every operation resolves its `path` argument relative to a single root
//! directory opened once at construction with [`cap_std::ambient_authority`].
//! Absolute paths, `..` components, and symlink traversal are rejected
//! before any capability-based open is attempted, mirroring the sandboxing
//! posture of a locked-system file source: treat every path as untrusted
//! input. Writes go through a temp-then-rename sequence so a crash or
//! connector error never leaves a partially written file observable to a
//! later read (spec.md §4.7 step 7).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write as _;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use agent_kernel_core::SideEffectClass;
use agent_kernel_core::ToolId;
use agent_kernel_core::ToolSpec;
use agent_kernel_core::interfaces::Connector;
use agent_kernel_core::interfaces::ConnectorError;
use cap_primitives::fs::FollowSymlinks;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use cap_std::fs::OpenOptions;
use serde_json::Value;
use serde_json::json;

/// Connector name this driver registers under in the Tool Runtime.
pub const CONNECTOR_NAME: &str = "local_fs";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Tunable limits for the local filesystem connector.
#[derive(Debug, Clone, Copy)]
pub struct LocalFsConfig {
    /// Maximum bytes a single `read_file` or `write_file` call may move.
    pub max_bytes: u64,
}

impl Default for LocalFsConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Local Filesystem Connector
// ============================================================================

/// Sandboxed local filesystem connector.
pub struct LocalFsConnector {
    /// Capability handle to the sandbox root; every operation resolves
    /// beneath it and can never escape, even given a malicious path.
    root: Dir,
    /// Tunable limits.
    config: LocalFsConfig,
    /// Monotonic counter backing atomic-write temp filenames.
    tmp_sequence: AtomicU64,
}

impl LocalFsConnector {
    /// Opens `root` as the connector's sandbox, using ambient authority.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Backend`] when `root` cannot be opened as a
    /// directory.
    pub fn new(root: impl AsRef<Path>, config: LocalFsConfig) -> Result<Self, ConnectorError> {
        let root = Dir::open_ambient_dir(root, ambient_authority()).map_err(|err| ConnectorError::Backend(err.to_string()))?;
        Ok(Self {
            root,
            config,
            tmp_sequence: AtomicU64::new(0),
        })
    }

    /// Declares the four tool contracts this connector dispatches.
    #[must_use]
    pub fn tool_specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                id: ToolId::new("fs.read_file"),
                version: "1.0.0".to_string(),
                side_effect: SideEffectClass::Read,
                required_scopes: std::collections::BTreeSet::from(["fs:read".to_string()]),
                connector: CONNECTOR_NAME.to_string(),
                input_schema: json!({"type": "object", "required": ["path"], "properties": {"path": {"type": "string"}}}),
                output_schema: json!({"type": "object", "properties": {"content": {"type": "string"}}}),
                description: "reads a UTF-8 text file relative to the sandbox root".to_string(),
            },
            ToolSpec {
                id: ToolId::new("fs.write_file"),
                version: "1.0.0".to_string(),
                side_effect: SideEffectClass::Write,
                required_scopes: std::collections::BTreeSet::from(["fs:write".to_string()]),
                connector: CONNECTOR_NAME.to_string(),
                input_schema: json!({
                    "type": "object",
                    "required": ["path", "content"],
                    "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                }),
                output_schema: json!({"type": "object", "properties": {"bytes_written": {"type": "integer"}}}),
                description: "atomically writes a UTF-8 text file relative to the sandbox root".to_string(),
            },
            ToolSpec {
                id: ToolId::new("fs.list_directory"),
                version: "1.0.0".to_string(),
                side_effect: SideEffectClass::Read,
                required_scopes: std::collections::BTreeSet::from(["fs:read".to_string()]),
                connector: CONNECTOR_NAME.to_string(),
                input_schema: json!({"type": "object", "properties": {"path": {"type": "string"}}}),
                output_schema: json!({"type": "object", "properties": {"entries": {"type": "array"}}}),
                description: "lists a directory's immediate entries relative to the sandbox root".to_string(),
            },
            ToolSpec {
                id: ToolId::new("fs.file_info"),
                version: "1.0.0".to_string(),
                side_effect: SideEffectClass::Read,
                required_scopes: std::collections::BTreeSet::from(["fs:read".to_string()]),
                connector: CONNECTOR_NAME.to_string(),
                input_schema: json!({"type": "object", "required": ["path"], "properties": {"path": {"type": "string"}}}),
                output_schema: json!({"type": "object"}),
                description: "reports existence, kind, and size for a path relative to the sandbox root".to_string(),
            },
        ]
    }

    /// Validates that `raw` is a relative path with no parent, root, or
    /// prefix components, rejecting anything that could escape the sandbox.
    fn sandboxed_path(raw: &str) -> Result<PathBuf, ConnectorError> {
        let path = Path::new(raw);
        if path.is_absolute() {
            return Err(ConnectorError::SandboxViolation(format!("path must be relative: {raw}")));
        }
        for component in path.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(ConnectorError::SandboxViolation(format!("path escapes sandbox: {raw}")));
            }
        }
        if path.as_os_str().is_empty() {
            return Err(ConnectorError::SandboxViolation("path must not be empty".to_string()));
        }
        Ok(path.to_path_buf())
    }

    /// Generates the next temp-file suffix for an atomic write.
    fn next_tmp_sequence(&self) -> u64 {
        self.tmp_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Reads a UTF-8 text file, enforcing `max_bytes`.
    fn read_file(&self, args: &Value) -> Result<Value, ConnectorError> {
        let path = required_str(args, "fs.read_file", "path")?;
        let relative = Self::sandboxed_path(path)?;

        let mut options = OpenOptions::new();
        options.read(true);
        options._cap_fs_ext_follow(FollowSymlinks::No);
        let mut file = self.root.open_with(&relative, &options).map_err(|err| map_open_error(&err, path))?;

        let metadata = file.metadata().map_err(|err| ConnectorError::Backend(err.to_string()))?;
        if metadata.is_dir() {
            return Err(ConnectorError::InvalidArgs {
                tool: ToolId::new("fs.read_file"),
                detail: "path refers to a directory".to_string(),
            });
        }

        let limit = self.config.max_bytes.saturating_add(1);
        let mut bytes = Vec::new();
        file.by_ref().take(limit).read_to_end(&mut bytes).map_err(|err| ConnectorError::Backend(err.to_string()))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > self.config.max_bytes {
            return Err(ConnectorError::Backend(format!("file exceeds max size of {} bytes", self.config.max_bytes)));
        }

        let content = String::from_utf8(bytes).map_err(|_err| ConnectorError::Backend("file is not valid utf-8".to_string()))?;
        Ok(json!({ "content": content }))
    }

    /// Atomically writes a UTF-8 text file: writes to a sibling temp name,
    /// flushes, then renames over the destination.
    fn write_file(&self, args: &Value) -> Result<Value, ConnectorError> {
        let path = required_str(args, "fs.write_file", "path")?;
        let content = required_str(args, "fs.write_file", "content")?;
        let relative = Self::sandboxed_path(path)?;
        if u64::try_from(content.len()).unwrap_or(u64::MAX) > self.config.max_bytes {
            return Err(ConnectorError::Backend(format!("content exceeds max size of {} bytes", self.config.max_bytes)));
        }

        let tmp_relative = {
            let mut name = relative.clone().into_os_string();
            name.push(format!(".tmp-{}", self.next_tmp_sequence()));
            PathBuf::from(name)
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        options._cap_fs_ext_follow(FollowSymlinks::No);
        let write_result = (|| -> Result<(), ConnectorError> {
            let mut tmp_file = self.root.open_with(&tmp_relative, &options).map_err(|err| ConnectorError::Backend(err.to_string()))?;
            tmp_file.write_all(content.as_bytes()).map_err(|err| ConnectorError::Backend(err.to_string()))?;
            tmp_file.sync_all().map_err(|err| ConnectorError::Backend(err.to_string()))?;
            Ok(())
        })();

        if let Err(error) = write_result {
            let _ = self.root.remove_file(&tmp_relative);
            return Err(error);
        }

        if let Err(err) = self.root.rename(&tmp_relative, &self.root, &relative) {
            let _ = self.root.remove_file(&tmp_relative);
            return Err(ConnectorError::Backend(err.to_string()));
        }

        Ok(json!({ "bytes_written": content.len() }))
    }

    /// Lists a directory's immediate entries. An empty or absent `path`
    /// lists the sandbox root itself.
    fn list_directory(&self, args: &Value) -> Result<Value, ConnectorError> {
        let path = args.get("path").and_then(Value::as_str).unwrap_or("");
        let read_dir = if path.is_empty() {
            self.root.entries().map_err(|err| ConnectorError::Backend(err.to_string()))?
        } else {
            let relative = Self::sandboxed_path(path)?;
            let sub_dir = self.root.open_dir(&relative).map_err(|err| map_open_error(&err, path))?;
            sub_dir.entries().map_err(|err| ConnectorError::Backend(err.to_string()))?
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|err| ConnectorError::Backend(err.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().is_ok_and(|file_type| file_type.is_dir());
            entries.push(json!({ "name": name, "is_dir": is_dir }));
        }
        Ok(json!({ "entries": entries }))
    }

    /// Reports existence, kind, and size for a path, without following a
    /// final symlink component.
    fn file_info(&self, args: &Value) -> Result<Value, ConnectorError> {
        let path = required_str(args, "fs.file_info", "path")?;
        let relative = Self::sandboxed_path(path)?;
        match self.root.symlink_metadata(&relative) {
            Ok(metadata) => Ok(json!({
                "exists": true,
                "is_dir": metadata.is_dir(),
                "is_file": metadata.is_file(),
                "len": metadata.len(),
            })),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(json!({
                "exists": false,
                "is_dir": false,
                "is_file": false,
                "len": 0,
            })),
            Err(err) => Err(ConnectorError::Backend(err.to_string())),
        }
    }
}

impl Connector for LocalFsConnector {
    fn declared_tools(&self) -> Vec<ToolSpec> {
        Self::tool_specs()
    }

    fn invoke(&self, tool_id: &ToolId, args: &Value) -> Result<Value, ConnectorError> {
        match tool_id.as_str() {
            "fs.read_file" => self.read_file(args),
            "fs.write_file" => self.write_file(args),
            "fs.list_directory" => self.list_directory(args),
            "fs.file_info" => self.file_info(args),
            _ => Err(ConnectorError::UnknownTool(tool_id.clone())),
        }
    }
}

/// Reads a required string field from `args`, or builds the matching
/// [`ConnectorError::InvalidArgs`].
fn required_str<'args>(args: &'args Value, tool: &str, field: &str) -> Result<&'args str, ConnectorError> {
    args.get(field).and_then(Value::as_str).ok_or_else(|| ConnectorError::InvalidArgs {
        tool: ToolId::new(tool),
        detail: format!("missing required string field: {field}"),
    })
}

/// Maps an open/lookup IO error into a connector error, treating
/// not-found and permission failures as distinct from generic backend
/// failures.
fn map_open_error(err: &std::io::Error, path: &str) -> ConnectorError {
    match err.kind() {
        ErrorKind::NotFound => ConnectorError::Backend(format!("not found: {path}")),
        ErrorKind::PermissionDenied | ErrorKind::InvalidInput => ConnectorError::SandboxViolation(format!("{path}: {err}")),
        _ => ConnectorError::Backend(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "test-only assertions")]

    use tempfile::tempdir;

    use super::*;

    fn connector() -> (tempfile::TempDir, LocalFsConnector) {
        let dir = tempdir().expect("tempdir");
        let connector = LocalFsConnector::new(dir.path(), LocalFsConfig::default()).expect("open sandbox");
        (dir, connector)
    }

    #[test]
    fn write_then_read_round_trips_content() {
        let (_dir, connector) = connector();
        connector.invoke(&ToolId::new("fs.write_file"), &json!({"path": "a.txt", "content": "hello"})).expect("write");
        let result = connector.invoke(&ToolId::new("fs.read_file"), &json!({"path": "a.txt"})).expect("read");
        assert_eq!(result, json!({"content": "hello"}));
    }

    #[test]
    fn path_traversal_is_rejected() {
        let (_dir, connector) = connector();
        let result = connector.invoke(&ToolId::new("fs.read_file"), &json!({"path": "../escape.txt"}));
        assert!(matches!(result, Err(ConnectorError::SandboxViolation(_))));
    }

    #[test]
    fn absolute_path_is_rejected() {
        let (_dir, connector) = connector();
        let result = connector.invoke(&ToolId::new("fs.write_file"), &json!({"path": "/etc/passwd", "content": "x"}));
        assert!(matches!(result, Err(ConnectorError::SandboxViolation(_))));
    }

    #[test]
    fn file_info_reports_missing_path_without_erroring() {
        let (_dir, connector) = connector();
        let result = connector.invoke(&ToolId::new("fs.file_info"), &json!({"path": "missing.txt"})).expect("file_info");
        assert_eq!(result, json!({"exists": false, "is_dir": false, "is_file": false, "len": 0}));
    }

    #[test]
    fn list_directory_reports_written_files() {
        let (_dir, connector) = connector();
        connector.invoke(&ToolId::new("fs.write_file"), &json!({"path": "a.txt", "content": "x"})).expect("write a");
        let result = connector.invoke(&ToolId::new("fs.list_directory"), &json!({})).expect("list");
        let entries = result.get("entries").and_then(Value::as_array).expect("entries array");
        assert!(entries.iter().any(|entry| entry.get("name").and_then(Value::as_str) == Some("a.txt")));
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let (_dir, connector) = connector();
        let result = connector.invoke(&ToolId::new("fs.delete_everything"), &json!({}));
        assert!(matches!(result, Err(ConnectorError::UnknownTool(_))));
    }
}

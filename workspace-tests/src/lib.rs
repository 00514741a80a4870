//! Helpers for checking the workspace manifests from tests

use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Root of the workspace, relative to this crate
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

pub fn read_manifest(path: &Path) -> Result<Table, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    content
        .parse::<Table>()
        .map_err(|e| format!("Failed to parse {:?}: {}", path, e))
}

pub fn root_manifest() -> Result<Table, String> {
    read_manifest(&workspace_root().join("Cargo.toml"))
}

/// `workspace.members` of the root manifest
pub fn members(root: &Table) -> Vec<String> {
    root.get("workspace")
        .and_then(|w| w.get("members"))
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Names declared under `workspace.dependencies`
pub fn shared_dependencies(root: &Table) -> Vec<String> {
    root.get("workspace")
        .and_then(|w| w.get("dependencies"))
        .and_then(Value::as_table)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

/// Every `(section, name, decl)` in the dependency tables of a member manifest
pub fn dependency_entries(manifest: &Table) -> Vec<(String, String, Value)> {
    ["dependencies", "dev-dependencies", "build-dependencies"]
        .iter()
        .filter_map(|section| {
            manifest
                .get(*section)
                .and_then(Value::as_table)
                .map(|table| (section, table))
        })
        .flat_map(|(section, table)| {
            table
                .iter()
                .map(move |(name, decl)| (section.to_string(), name.clone(), decl.clone()))
        })
        .collect()
}

/// Whether a dependency declaration is `{ workspace = true, .. }`
pub fn inherits_workspace(decl: &Value) -> bool {
    decl.get("workspace").and_then(Value::as_bool) == Some(true)
}

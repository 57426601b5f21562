use std::fs;
use std::path::{Component, Path, PathBuf};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[schemars(title = "CLR Bridge Configuration")]
pub struct BridgeConfig {
    /// Location of the managed runtime's shared components
    #[serde(default = "default_runtime_library_path")]
    #[schemars(description = "Directory holding the .NET shared runtime (libcoreclr and framework assemblies)")]
    pub runtime_library_path: PathBuf,

    /// Directory under the working directory that holds all resources
    #[serde(default = "default_resources_subpath")]
    #[schemars(description = "Resources directory, relative to the host working directory")]
    pub resources_subpath: PathBuf,

    /// Assembly exporting the entry points
    #[serde(default = "default_entry_namespace")]
    #[schemars(description = "Assembly name that contains the module wrapper type")]
    pub entry_namespace: String,

    /// Fully-qualified type exporting the entry points
    #[serde(default = "default_entry_type")]
    #[schemars(description = "Fully-qualified name of the module wrapper type")]
    pub entry_type: String,
}

fn default_runtime_library_path() -> PathBuf {
    PathBuf::from("/usr/share/dotnet/shared/Microsoft.NETCore.App/2.2.1")
}

fn default_resources_subpath() -> PathBuf {
    PathBuf::from("resources")
}

fn default_entry_namespace() -> String {
    "AltV.Net".to_string()
}

fn default_entry_type() -> String {
    "AltV.Net.ModuleWrapper".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime_library_path: default_runtime_library_path(),
            resources_subpath: default_resources_subpath(),
            entry_namespace: default_entry_namespace(),
            entry_type: default_entry_type(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        load_validated(path)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        parse_validated(json)
    }

    /// Root path of a resource: `<working dir>/<resources subpath>/<name>`
    ///
    /// The name must stay inside the resources directory: empty, absolute
    /// and `..` names are rejected.
    pub fn resource_root(&self, working_dir: &Path, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let mut components = relative.components().peekable();
        if components.peek().is_none() || !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(BridgeError::InvalidResourceName(name.to_string()));
        }
        Ok(working_dir.join(&self.resources_subpath).join(relative))
    }
}

/// Read a JSON file and validate it against the schema of `T`
pub fn load_validated<T: JsonSchema + DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        BridgeError::Config(format!("Failed to read file '{}': {}", path.display(), e))
    })?;
    parse_validated(&content)
}

/// Parse JSON, validate it against the schema of `T`, then deserialize
pub fn parse_validated<T: JsonSchema + DeserializeOwned>(json: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| BridgeError::Config(format!("JSON parse error: {}", e)))?;

    let schema = schemars::schema_for!(T);
    let schema_json = serde_json::to_value(&schema)
        .map_err(|e| BridgeError::Config(format!("Schema serialization error: {}", e)))?;

    let validator = jsonschema::validator_for(&schema_json)
        .map_err(|e| BridgeError::Config(format!("Invalid schema: {}", e)))?;

    validator
        .validate(&value)
        .map_err(|e| BridgeError::Config(format!("Schema validation failed: {}", e)))?;

    serde_json::from_value(value).map_err(|e| BridgeError::Config(format!("Invalid value: {}", e)))
}

//! Interface configuration.
//!
//! The agent ships an `interface.json` describing the project; the
//! loader only needs the agent entry block from it: the plugin root is
//! the parent directory of the first agent argument naming a plugin
//! script. The rest of the file (task and option schemas) belongs to
//! external collaborators and is not modeled here beyond the basic
//! metadata the CLI prints.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::loader::PLUGIN_EXTENSION;

/// Placeholder expanded to the project directory in configured paths.
pub const PROJECT_DIR_TOKEN: &str = "{PROJECT_DIR}";

/// Default interface configuration file name.
pub const INTERFACE_FILE: &str = "interface.json";

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading the interface configuration.
///
/// These are the only fatal errors in the subsystem: without a
/// derivable plugin root there is nothing to scan.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Failed to read interface configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON.
    #[error("Invalid interface configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// No agent argument names a plugin entry file.
    #[error("Interface agent configuration does not name a plugin entry file")]
    MissingAgentEntry,
}

/// The interface configuration, reduced to what the loader and the CLI
/// consume.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceConfig {
    /// Project name.
    #[serde(default)]
    pub name: Option<String>,
    /// Project version.
    #[serde(default)]
    pub version: Option<String>,
    /// Project homepage.
    #[serde(default)]
    pub url: Option<String>,
    /// Agent process description.
    #[serde(default)]
    pub agent: Option<AgentConfig>,
}

/// The `agent` block: how the agent process is launched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    /// Arguments handed to the agent child process; one of them names
    /// the plugin entry file.
    #[serde(default)]
    pub child_args: Vec<String>,
}

impl InterfaceConfig {
    /// Parse from a JSON string.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse from a file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&content)
    }

    /// The agent entry file: the first `child_args` entry with the
    /// plugin extension, with `{PROJECT_DIR}` and `~` expanded.
    pub fn agent_entry(&self, project_dir: &Path) -> ConfigResult<PathBuf> {
        let agent = self.agent.as_ref().ok_or(ConfigError::MissingAgentEntry)?;
        agent
            .child_args
            .iter()
            .find(|arg| {
                Path::new(arg.as_str())
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == PLUGIN_EXTENSION)
            })
            .map(|arg| expand_path(arg, project_dir))
            .ok_or(ConfigError::MissingAgentEntry)
    }

    /// The plugin root: the parent directory of the agent entry file.
    pub fn plugin_root(&self, project_dir: &Path) -> ConfigResult<PathBuf> {
        let entry = self.agent_entry(project_dir)?;
        match entry.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
            _ => Ok(project_dir.to_path_buf()),
        }
    }
}

/// Expand `{PROJECT_DIR}` and a leading tilde in a configured path.
fn expand_path(arg: &str, project_dir: &Path) -> PathBuf {
    let replaced = arg.replace(PROJECT_DIR_TOKEN, &project_dir.to_string_lossy());
    PathBuf::from(shellexpand::tilde(&replaced).into_owned())
}

//! Loader error types.
//!
//! Per-module and per-declaration failures during a load cycle are
//! logged and skipped, never surfaced here; this enum covers only the
//! conditions that prevent a cycle from starting at all.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors that abort a plugin load cycle before it begins.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The plugin root does not exist or is not a directory.
    #[error("Plugin root is not a directory: {0}")]
    RootNotFound(PathBuf),

    /// The plugin root could not be derived from the interface
    /// configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

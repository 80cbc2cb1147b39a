//! Script engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Errors raised while resolving, parsing, or executing a plugin script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Source could not be parsed.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// No module with this logical name exists anywhere in the
    /// resolution chain.
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// A `from … import` named a symbol the target module does not
    /// define (yet). This is the failure mode of a forward reference
    /// across an import cycle.
    #[error("Cannot import name '{name}' from '{module}'")]
    ImportName { name: String, module: String },

    /// A name was referenced before anything was bound to it.
    #[error("Undefined name '{0}'")]
    Undefined(String),

    /// Attribute access on a value that has no such attribute.
    #[error("No attribute '{attr}' on {target}")]
    Attribute { target: String, attr: String },

    /// A relative import walked above the top-level package.
    #[error("Relative import beyond top-level package in '{0}'")]
    RelativeImport(String),

    /// The module's source file could not be read.
    #[error("Failed to read module source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

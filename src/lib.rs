//! # Caprun
//!
//! Plugin capability loader for automation agents.
//!
//! Caprun discovers plugin scripts under a plugin root, resolves them
//! through its own module host (mutual imports between plugin files
//! included), and registers the capabilities they declare into typed
//! action and recognition registries the execution engine consumes.
//!
//! ## How a load cycle works
//!
//! 1. **Scan**: walk the root for `.cap` files and derive a dotted
//!    logical name per file ([`loader::scan_modules`]).
//! 2. **Annotate**: text-scan every file for
//!    `@AgentServer.custom_action("…")` /
//!    `@AgentServer.custom_recognition("…")` markers followed by a
//!    class declaration ([`loader::scan_annotations`]).
//! 3. **Load**: install a resolution hook scoped to the scanned names
//!    and execute every module, with the self-registration marker
//!    lines neutralized; the hook is removed when loading ends, on
//!    success and failure alike.
//! 4. **Register**: instantiate each declared class and register it
//!    under its declared name and kind ([`loader::register_capabilities`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use caprun::capability::CapabilityRegistry;
//! use caprun::loader::PluginLoader;
//! use caprun::script::ModuleHost;
//!
//! let host = ModuleHost::new();
//! let mut registry = CapabilityRegistry::new();
//! let report = PluginLoader::new("./plugins").load(&host, &mut registry)?;
//! # Ok::<(), caprun::loader::LoaderError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::manual_let_else)]

pub mod capability;
pub mod config;
pub mod loader;
pub mod script;

pub use capability::{CapabilityKind, CapabilityRegistry, CapabilitySink, ScriptCapability};
pub use config::{ConfigError, InterfaceConfig};
pub use loader::{
    CapabilityDeclaration, LoadReport, LoaderError, ModuleRecord, ModuleRegistry, PluginLoader,
};
pub use script::{FrameworkHooks, Module, ModuleHost, ScriptError, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "caprun";

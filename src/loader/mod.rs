//! Plugin discovery, loading, and capability registration.
//!
//! One load cycle is: scan the plugin root into a module registry,
//! text-scan every file for capability markers, install the
//! circular-safe resolution hook, resolve every registered module
//! (mutual imports included), drop the hook, then instantiate and
//! register the discovered classes into the capability sink.
//!
//! # Failure policy
//!
//! Per-file, per-module, and per-declaration failures are logged and
//! skipped; a broken plugin never takes its siblings down. The only
//! fatal conditions are a missing plugin root and an interface
//! configuration the root cannot be derived from.
//!
//! # Example
//!
//! ```no_run
//! use caprun::capability::CapabilityRegistry;
//! use caprun::loader::PluginLoader;
//! use caprun::script::ModuleHost;
//!
//! let host = ModuleHost::new();
//! let mut registry = CapabilityRegistry::new();
//! let report = PluginLoader::new("./plugins").load(&host, &mut registry)?;
//! println!("{} capabilities registered", report.registered);
//! # Ok::<(), caprun::loader::LoaderError>(())
//! ```

mod annotations;
mod error;
mod hook;
mod registrar;
mod scanner;

pub use annotations::{scan_annotations, CapabilityDeclaration};
pub use error::{LoaderError, LoaderResult};
pub use hook::{strip_self_registration, RegistryHook};
pub use registrar::{register_capabilities, RegistrarOutcome};
pub use scanner::{scan_modules, ModuleRecord, ModuleRegistry};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::capability::CapabilitySink;
use crate::config::InterfaceConfig;
use crate::script::ModuleHost;

/// Plugin script file extension.
pub const PLUGIN_EXTENSION: &str = "cap";

/// Package marker file name.
pub const PACKAGE_MARKER: &str = "__init__.cap";

/// Token identifying self-registration marker lines. Any source line
/// containing it is neutralized before execution.
pub const SELF_REGISTRATION_TOKEN: &str = "AgentServer";

/// Summary of one load cycle.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Modules discovered by the scan.
    pub modules: usize,
    /// Modules that loaded successfully.
    pub loaded: usize,
    /// Logical names of modules that failed to load.
    pub failed: Vec<String>,
    /// Capability declarations discovered by the text scan.
    pub declared: usize,
    /// Declarations registered into the sink.
    pub registered: usize,
    /// Declarations skipped by the registrar.
    pub skipped: usize,
}

/// Runs load cycles over one plugin root.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    root: PathBuf,
}

impl PluginLoader {
    /// Create a loader over the given plugin root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a loader from the interface configuration: the plugin
    /// root is the parent directory of the agent entry file.
    pub fn from_interface(
        config: &InterfaceConfig,
        project_dir: &Path,
    ) -> Result<Self, LoaderError> {
        Ok(Self::new(config.plugin_root(project_dir)?))
    }

    /// The plugin root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run one full load cycle: scan, annotate, load, register.
    ///
    /// The resolution hook is installed only for the loading step and
    /// removed on every exit path before registration begins.
    pub fn load(
        &self,
        host: &ModuleHost,
        sink: &mut dyn CapabilitySink,
    ) -> Result<LoadReport, LoaderError> {
        let registry = scan_modules(&self.root)?;
        info!(
            root = %self.root.display(),
            modules = registry.len(),
            "Scanned plugin root"
        );

        let declarations = scan_annotations(&registry);
        let modules = registry.len();
        let registry = Arc::new(registry);

        let mut failed = Vec::new();
        {
            let _hook = host.install_hook(Arc::new(RegistryHook::new(Arc::clone(&registry))));
            for name in registry.names() {
                if host.module(name).is_some() {
                    // Already resolved through a cycle short-circuit.
                    continue;
                }
                if let Err(e) = host.resolve(name) {
                    warn!(module = %name, error = %e, "Plugin module failed to load");
                    failed.push(name.to_string());
                }
            }
        }

        let outcome = register_capabilities(&declarations, host, sink);
        let report = LoadReport {
            modules,
            loaded: modules - failed.len(),
            failed,
            declared: declarations.len(),
            registered: outcome.registered,
            skipped: outcome.skipped,
        };
        info!(
            loaded = report.loaded,
            failed = report.failed.len(),
            registered = report.registered,
            skipped = report.skipped,
            "Plugin load cycle complete"
        );
        Ok(report)
    }
}

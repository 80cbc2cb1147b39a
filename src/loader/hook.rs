//! The circular-safe resolution hook.
//!
//! [`RegistryHook`] intercepts resolution for exactly the logical
//! names in one module registry; every other name falls through to the
//! rest of the chain untouched. Loading a module:
//!
//! 1. create its empty namespace and put it in the host table *before*
//!    executing anything (the crux of cycle tolerance);
//! 2. read the source and blank out every line containing the
//!    framework's self-registration token, so the marker's own
//!    registration path never runs;
//! 3. parse and execute the filtered source against the namespace.
//!
//! A failure at any step evicts the half-initialized module from the
//! table and surfaces a per-module error the driving loop logs and
//! moves past.

use std::fs;
use std::sync::Arc;

use tracing::debug;

use super::scanner::{ModuleRecord, ModuleRegistry};
use super::SELF_REGISTRATION_TOKEN;
use crate::script::{execute, parse_source, Module, ModuleHost, ResolveHook, ScriptError};

/// Resolution hook scoped to one module registry.
pub struct RegistryHook {
    registry: Arc<ModuleRegistry>,
}

impl RegistryHook {
    /// Create a hook over the given registry.
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }
}

impl ResolveHook for RegistryHook {
    fn resolve(&self, name: &str, host: &ModuleHost) -> Option<Result<Arc<Module>, ScriptError>> {
        let record = self.registry.get(name)?;
        Some(load_record(record, host))
    }
}

fn load_record(record: &ModuleRecord, host: &ModuleHost) -> Result<Arc<Module>, ScriptError> {
    let module = Arc::new(if record.is_package {
        Module::package(&record.logical_name, record.source_path.clone())
    } else {
        Module::leaf(&record.logical_name, record.source_path.clone())
    });

    // Visible in the table before the body runs: a module halfway
    // through execution can already be found by the other side of an
    // import cycle.
    host.register_module(Arc::clone(&module));
    debug!(module = %record.logical_name, "Executing plugin module");

    if let Err(e) = execute_record(record, &module, host) {
        host.remove_module(&record.logical_name);
        return Err(e);
    }
    Ok(module)
}

fn execute_record(
    record: &ModuleRecord,
    module: &Arc<Module>,
    host: &ModuleHost,
) -> Result<(), ScriptError> {
    let source = fs::read_to_string(&record.source_path).map_err(|source| {
        ScriptError::Source { path: record.source_path.clone(), source }
    })?;
    let filtered = strip_self_registration(&source);
    let stmts = parse_source(&filtered)?;
    execute(&stmts, module, host)
}

/// Blank out every line containing the self-registration token.
///
/// Blanking rather than removing keeps line numbers stable for parse
/// diagnostics. Whole-line matching cannot handle a marker call split
/// across lines; that is a documented limitation of the marker
/// convention itself.
pub fn strip_self_registration(source: &str) -> String {
    source
        .lines()
        .map(|line| if line.contains(SELF_REGISTRATION_TOKEN) { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

//! The module host: global module table and resolution chain.
//!
//! The host stands in for a language runtime's import machinery. It
//! owns the table of loaded modules, a chain of installable resolution
//! hooks, and the builtin `agent.*` modules plugin scripts import their
//! base classes from. Resolution order is: table hit, installed hooks
//! (front to back), builtins.
//!
//! Hooks are installed through [`ModuleHost::install_hook`], which
//! returns an RAII [`HookGuard`]; dropping the guard removes the hook,
//! so the chain is restored on every exit path, including unwinding.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::ScriptError;
use super::value::Value;
use crate::capability::CapabilityKind;

/// Builtin modules available without any hook installed. Plugin
/// scripts import their capability base classes from these.
const BUILTIN_MODULES: &[(&str, &[&str])] = &[
    ("agent", &[]),
    ("agent.custom_action", &["CustomAction"]),
    ("agent.custom_recognition", &["CustomRecognition"]),
    ("agent.server", &["AgentServer"]),
];

/// Host-framework callbacks observed by executing scripts.
///
/// The only callback today is the self-registration marker: a
/// `@AgentServer.custom_action("…")` decorator line invokes it when
/// executed. The loader strips those lines before execution, so during
/// a load cycle this is never called; a non-null implementation is
/// useful to verify exactly that.
pub trait FrameworkHooks: Send + Sync {
    /// A self-registration marker executed with the given kind and name.
    fn self_register(&self, kind: CapabilityKind, name: &str);
}

/// Default framework hooks: log and ignore.
pub struct NullFramework;

impl FrameworkHooks for NullFramework {
    fn self_register(&self, kind: CapabilityKind, name: &str) {
        tracing::trace!(kind = %kind, name = %name, "Self-registration marker executed");
    }
}

/// A handler in the module-resolution chain.
///
/// Returning `None` means the hook does not claim the name and
/// resolution falls through to the next handler.
pub trait ResolveHook: Send + Sync {
    fn resolve(&self, name: &str, host: &ModuleHost) -> Option<Result<Arc<Module>, ScriptError>>;
}

/// A loaded (possibly still-executing) module namespace.
pub struct Module {
    name: String,
    source_path: Option<PathBuf>,
    /// Dotted name of the containing package; empty at top level.
    package: String,
    /// Directory searched for relative submodules; packages only.
    search_path: Option<PathBuf>,
    namespace: RwLock<HashMap<String, Value>>,
}

impl Module {
    /// Create a leaf module. Its package is the parent of its logical
    /// name (`a.b.c` lives in package `a.b`).
    pub fn leaf(name: &str, source_path: PathBuf) -> Self {
        let package = name.rsplit_once('.').map(|(pkg, _)| pkg.to_string()).unwrap_or_default();
        Self {
            name: name.to_string(),
            source_path: Some(source_path),
            package,
            search_path: None,
            namespace: RwLock::new(HashMap::new()),
        }
    }

    /// Create a package module. Its package is itself, and its search
    /// path is the directory containing the package marker.
    pub fn package(name: &str, marker_path: PathBuf) -> Self {
        let search_path = marker_path.parent().map(PathBuf::from);
        Self {
            name: name.to_string(),
            source_path: Some(marker_path),
            package: name.to_string(),
            search_path,
            namespace: RwLock::new(HashMap::new()),
        }
    }

    /// Create a builtin module with pre-bound symbols.
    fn builtin(name: &str, symbols: &[&'static str]) -> Self {
        let namespace =
            symbols.iter().map(|&s| (s.to_string(), Value::Builtin(s))).collect();
        Self {
            name: name.to_string(),
            source_path: None,
            package: name.to_string(),
            search_path: None,
            namespace: RwLock::new(namespace),
        }
    }

    /// Logical module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Containing package name; empty at top level.
    pub fn package_name(&self) -> &str {
        &self.package
    }

    /// Source file this module was loaded from, if any.
    pub fn source_path(&self) -> Option<&PathBuf> {
        self.source_path.as_ref()
    }

    /// Whether this module is a package.
    pub fn is_package(&self) -> bool {
        self.search_path.is_some()
    }

    /// Look up a bound name.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.namespace.read().get(key).cloned()
    }

    /// Bind a name.
    pub fn set(&self, key: &str, value: Value) {
        self.namespace.write().insert(key.to_string(), value);
    }

    /// All bound names, sorted, for diagnostics.
    pub fn symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespace.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("package", &self.package)
            .field("symbols", &self.namespace.read().len())
            .finish()
    }
}

/// The global module table plus the resolution chain.
///
/// Locks are held only across individual table operations, never
/// across recursive resolution, so the single-threaded load cycle
/// cannot deadlock on its own re-entrancy.
pub struct ModuleHost {
    modules: RwLock<HashMap<String, Arc<Module>>>,
    hooks: RwLock<Vec<(u64, Arc<dyn ResolveHook>)>>,
    next_hook_id: AtomicU64,
    framework: Arc<dyn FrameworkHooks>,
}

impl ModuleHost {
    /// Create a host with the default (logging, no-op) framework hooks.
    pub fn new() -> Self {
        Self::with_framework(Arc::new(NullFramework))
    }

    /// Create a host with custom framework hooks.
    pub fn with_framework(framework: Arc<dyn FrameworkHooks>) -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Vec::new()),
            next_hook_id: AtomicU64::new(0),
            framework,
        }
    }

    /// The framework hooks scripts observe.
    pub fn framework(&self) -> &dyn FrameworkHooks {
        &*self.framework
    }

    /// Look up a module already present in the table.
    pub fn module(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.read().get(name).cloned()
    }

    /// Number of modules in the table.
    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }

    /// Insert a module into the table. The loader does this *before*
    /// executing the module body, which is what makes import cycles
    /// resolvable: a module halfway through execution is already
    /// visible here.
    pub fn register_module(&self, module: Arc<Module>) {
        self.modules.write().insert(module.name().to_string(), module);
    }

    /// Remove a module from the table (after a failed execution).
    pub fn remove_module(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.write().remove(name)
    }

    /// Install a hook at the front of the resolution chain. The hook
    /// stays installed until the returned guard is dropped.
    pub fn install_hook(&self, hook: Arc<dyn ResolveHook>) -> HookGuard<'_> {
        let id = self.next_hook_id.fetch_add(1, Ordering::Relaxed);
        self.hooks.write().insert(0, (id, hook));
        HookGuard { host: self, id }
    }

    /// Number of installed hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }

    fn remove_hook(&self, id: u64) {
        self.hooks.write().retain(|(hook_id, _)| *hook_id != id);
    }

    /// Resolve a logical module name: table hit first, then installed
    /// hooks front to back, then builtins.
    pub fn resolve(&self, name: &str) -> Result<Arc<Module>, ScriptError> {
        if let Some(module) = self.module(name) {
            return Ok(module);
        }

        // Snapshot the chain so no lock is held across hook execution,
        // which recurses back into resolve for imports.
        let hooks: Vec<Arc<dyn ResolveHook>> =
            self.hooks.read().iter().map(|(_, hook)| Arc::clone(hook)).collect();
        for hook in hooks {
            if let Some(outcome) = hook.resolve(name, self) {
                return outcome;
            }
        }

        self.resolve_builtin(name)
            .ok_or_else(|| ScriptError::ModuleNotFound(name.to_string()))
    }

    fn resolve_builtin(&self, name: &str) -> Option<Arc<Module>> {
        let (builtin_name, symbols) =
            BUILTIN_MODULES.iter().find(|entry| entry.0 == name).copied()?;
        let module = Arc::new(Module::builtin(builtin_name, symbols));
        self.register_module(Arc::clone(&module));
        Some(module)
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("modules", &self.modules.read().len())
            .field("hooks", &self.hooks.read().len())
            .finish()
    }
}

/// RAII guard for an installed resolution hook. Removal happens on
/// drop, on success, early return, and unwinding alike.
pub struct HookGuard<'a> {
    host: &'a ModuleHost,
    id: u64,
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        self.host.remove_hook(self.id);
    }
}

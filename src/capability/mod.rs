//! Capability types and registries.
//!
//! A capability is a pluggable unit of behavior the execution engine
//! invokes during task runs: an *action* (drives the device) or a
//! *recognition* (inspects the screen). Plugins declare capabilities
//! with the framework marker; the loader discovers, instantiates, and
//! registers them here.
//!
//! The engine seam is the [`CapabilitySink`] trait: the registrar
//! calls `register(kind, name, instance)` exactly once per surviving
//! declaration. [`CapabilityRegistry`] is the default in-process sink,
//! holding one name-keyed map per kind.

mod registry;

pub use registry::CapabilityRegistry;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::script::{eval_expr, ClassDef, ModuleHost, ScriptError, Value};

/// Kind of capability a plugin provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Action provider - drives the device during task execution.
    Action,
    /// Recognition provider - inspects screen state during task execution.
    Recognition,
}

impl CapabilityKind {
    /// Get the display name for this capability kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Recognition => "recognition",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Registration target for instantiated capabilities.
///
/// The execution engine provides an implementation of this; the
/// registrar feeds it. Registering a name twice replaces the earlier
/// instance (last write wins).
pub trait CapabilitySink {
    fn register(&mut self, kind: CapabilityKind, name: &str, capability: ScriptCapability);
}

/// An instantiated plugin capability.
///
/// Instantiation evaluates the declaring class's parameter expressions
/// in its module's namespace; the resulting instance is what the
/// execution engine holds for the process lifetime.
#[derive(Debug)]
pub struct ScriptCapability {
    kind: CapabilityKind,
    name: String,
    class_name: String,
    module: String,
    params: HashMap<String, Value>,
}

impl ScriptCapability {
    /// Instantiate a declared class with no arguments.
    pub fn instantiate(
        class: &ClassDef,
        kind: CapabilityKind,
        name: &str,
        host: &ModuleHost,
    ) -> Result<Self, ScriptError> {
        let owner = host
            .module(&class.module)
            .ok_or_else(|| ScriptError::ModuleNotFound(class.module.clone()))?;

        let mut params = HashMap::new();
        for (key, expr) in &class.params {
            params.insert(key.clone(), eval_expr(expr, &owner, host)?);
        }

        Ok(Self {
            kind,
            name: name.to_string(),
            class_name: class.name.clone(),
            module: class.module.clone(),
            params,
        })
    }

    /// The kind this capability was registered under.
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// The declared (external-facing) capability name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class this instance was built from.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Logical name of the module that declared the class.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Look up an evaluated parameter.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// All evaluated parameters.
    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::script::{parse_source, execute, Module};

    fn loaded_module(source: &str, host: &ModuleHost) -> Arc<Module> {
        let module = Arc::new(Module::leaf("plug", PathBuf::from("/x/plug.cap")));
        host.register_module(Arc::clone(&module));
        execute(&parse_source(source).unwrap(), &module, host).unwrap();
        module
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(CapabilityKind::Action.to_string(), "action");
        assert_eq!(CapabilityKind::Recognition.to_string(), "recognition");
    }

    #[test]
    fn test_instantiate_evaluates_params() {
        let host = ModuleHost::new();
        let module = loaded_module("DELAY = 100\nclass Foo:\n    delay = DELAY\n", &host);
        let Some(Value::Class(class)) = module.get("Foo") else { panic!("class not bound") };

        let capability =
            ScriptCapability::instantiate(&class, CapabilityKind::Action, "do_foo", &host)
                .unwrap();
        assert_eq!(capability.name(), "do_foo");
        assert_eq!(capability.class_name(), "Foo");
        assert_eq!(capability.module(), "plug");
        assert!(matches!(capability.param("delay"), Some(Value::Int(100))));
    }

    #[test]
    fn test_instantiate_fails_on_unbound_param() {
        let host = ModuleHost::new();
        // MISSING is never bound; class declaration itself succeeds.
        let module = loaded_module("class Foo:\n    delay = MISSING\n", &host);
        let Some(Value::Class(class)) = module.get("Foo") else { panic!("class not bound") };

        let err = ScriptCapability::instantiate(&class, CapabilityKind::Action, "do_foo", &host)
            .unwrap_err();
        assert!(matches!(err, ScriptError::Undefined(_)));
    }
}

//! Capability registrar: bind discovered declarations to instances.
//!
//! Runs after the load cycle, hook already removed. Every failure here
//! is per-declaration: a missing module means that module failed to
//! load (already logged), a missing or non-class symbol means a
//! malformed plugin, and an instantiation error means a parameter
//! expression did not evaluate. Each is logged and skipped; the rest
//! of the declarations still register.

use tracing::{debug, warn};

use super::annotations::CapabilityDeclaration;
use crate::capability::{CapabilitySink, ScriptCapability};
use crate::script::{ModuleHost, Value};

/// Outcome counts of one registrar pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistrarOutcome {
    /// Declarations registered into the sink.
    pub registered: usize,
    /// Declarations skipped (module missing, class missing, or
    /// instantiation failed).
    pub skipped: usize,
}

/// Register every declaration whose module and class survived loading.
pub fn register_capabilities(
    declarations: &[CapabilityDeclaration],
    host: &ModuleHost,
    sink: &mut dyn CapabilitySink,
) -> RegistrarOutcome {
    let mut outcome = RegistrarOutcome::default();

    for declaration in declarations {
        let Some(module) = host.module(&declaration.module) else {
            // The owning module failed to load; its failure was already
            // logged by the driving loop.
            debug!(
                module = %declaration.module,
                capability = %declaration.name,
                "Skipping capability from unavailable module"
            );
            outcome.skipped += 1;
            continue;
        };

        let class = match module.get(&declaration.class_name) {
            Some(Value::Class(class)) => class,
            Some(other) => {
                warn!(
                    module = %declaration.module,
                    class = %declaration.class_name,
                    found = other.type_name(),
                    "Declared capability symbol is not a class"
                );
                outcome.skipped += 1;
                continue;
            }
            None => {
                warn!(
                    module = %declaration.module,
                    class = %declaration.class_name,
                    capability = %declaration.name,
                    "Declared class not found in module"
                );
                outcome.skipped += 1;
                continue;
            }
        };

        match ScriptCapability::instantiate(&class, declaration.kind, &declaration.name, host) {
            Ok(capability) => {
                debug!(
                    kind = %declaration.kind,
                    name = %declaration.name,
                    class = %declaration.class_name,
                    "Registered capability"
                );
                sink.register(declaration.kind, &declaration.name, capability);
                outcome.registered += 1;
            }
            Err(e) => {
                warn!(
                    kind = %declaration.kind,
                    name = %declaration.name,
                    class = %declaration.class_name,
                    error = %e,
                    "Failed to instantiate capability"
                );
                outcome.skipped += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::capability::{CapabilityKind, CapabilityRegistry};
    use crate::script::{execute, parse_source, Module};

    fn host_with_module(name: &str, source: &str) -> ModuleHost {
        let host = ModuleHost::new();
        let module = Arc::new(Module::leaf(name, PathBuf::from(format!("/x/{name}.cap"))));
        host.register_module(Arc::clone(&module));
        execute(&parse_source(source).unwrap(), &module, &host).unwrap();
        host
    }

    fn declaration(kind: CapabilityKind, name: &str, class: &str, module: &str) -> CapabilityDeclaration {
        CapabilityDeclaration {
            kind,
            name: name.to_string(),
            class_name: class.to_string(),
            module: module.to_string(),
        }
    }

    #[test]
    fn test_registers_declared_class() {
        let host = host_with_module("plug", "class Foo:\n    pass\n");
        let declarations =
            vec![declaration(CapabilityKind::Action, "do_foo", "Foo", "plug")];
        let mut registry = CapabilityRegistry::new();

        let outcome = register_capabilities(&declarations, &host, &mut registry);
        assert_eq!(outcome, RegistrarOutcome { registered: 1, skipped: 0 });
        assert_eq!(registry.action("do_foo").unwrap().class_name(), "Foo");
    }

    #[test]
    fn test_missing_module_is_skipped() {
        let host = ModuleHost::new();
        let declarations =
            vec![declaration(CapabilityKind::Action, "do_foo", "Foo", "gone")];
        let mut registry = CapabilityRegistry::new();

        let outcome = register_capabilities(&declarations, &host, &mut registry);
        assert_eq!(outcome, RegistrarOutcome { registered: 0, skipped: 1 });
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_class_is_skipped() {
        let host = host_with_module("plug", "X = 1\n");
        let declarations =
            vec![declaration(CapabilityKind::Action, "do_foo", "Foo", "plug")];
        let mut registry = CapabilityRegistry::new();

        let outcome = register_capabilities(&declarations, &host, &mut registry);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn test_non_class_symbol_is_skipped() {
        let host = host_with_module("plug", "Foo = 42\n");
        let declarations =
            vec![declaration(CapabilityKind::Action, "do_foo", "Foo", "plug")];
        let mut registry = CapabilityRegistry::new();

        let outcome = register_capabilities(&declarations, &host, &mut registry);
        assert_eq!(outcome.skipped, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_instantiation_failure_does_not_abort_pass() {
        let host = host_with_module(
            "plug",
            "class Bad:\n    x = MISSING\nclass Good:\n    pass\n",
        );
        let declarations = vec![
            declaration(CapabilityKind::Action, "bad", "Bad", "plug"),
            declaration(CapabilityKind::Action, "good", "Good", "plug"),
        ];
        let mut registry = CapabilityRegistry::new();

        let outcome = register_capabilities(&declarations, &host, &mut registry);
        assert_eq!(outcome, RegistrarOutcome { registered: 1, skipped: 1 });
        assert!(registry.action("bad").is_none());
        assert!(registry.action("good").is_some());
    }
}

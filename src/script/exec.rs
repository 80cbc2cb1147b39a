//! Statement execution against a module namespace.
//!
//! Statements run in source order. Imports trigger recursive
//! resolution through the host; names bind into the module's namespace
//! as soon as each statement completes, so a module that is itself
//! mid-execution already exposes everything bound so far. That is the
//! entire cycle-tolerance contract: a mutual import succeeds exactly
//! when each needed symbol is bound before the other side dereferences
//! it.

use std::sync::Arc;

use tracing::trace;

use super::error::ScriptError;
use super::host::{Module, ModuleHost};
use super::parser::{DecoratorCall, Expr, Stmt};
use super::value::{ClassDef, Value};
use crate::capability::CapabilityKind;

/// Execute parsed statements against a module's namespace.
pub fn execute(stmts: &[Stmt], module: &Arc<Module>, host: &ModuleHost) -> Result<(), ScriptError> {
    for stmt in stmts {
        match stmt {
            Stmt::Import { target, alias } => {
                host.resolve(target)?;
                let bound = alias
                    .clone()
                    .unwrap_or_else(|| target.rsplit('.').next().unwrap_or(target).to_string());
                module.set(&bound, Value::ModuleRef(target.clone()));
            }
            Stmt::FromImport { module: target, level, names } => {
                let absolute = resolve_import_target(module, *level, target)?;
                let imported = host.resolve(&absolute)?;
                for (name, alias) in names {
                    let value = import_symbol(&imported, name, host)?;
                    module.set(alias.as_deref().unwrap_or(name), value);
                }
            }
            Stmt::Assign { name, value } => {
                let evaluated = eval_expr(value, module, host)?;
                module.set(name, evaluated);
            }
            Stmt::Class(decl) => {
                let class = ClassDef {
                    name: decl.name.clone(),
                    base: decl.base.clone(),
                    module: module.name().to_string(),
                    params: decl.body.clone(),
                };
                module.set(&decl.name, Value::Class(Arc::new(class)));
            }
            Stmt::Decorator(call) => execute_decorator(call, host),
            Stmt::Pass => {}
        }
    }
    Ok(())
}

/// Evaluate an expression in a module's namespace.
pub fn eval_expr(expr: &Expr, module: &Module, host: &ModuleHost) -> Result<Value, ScriptError> {
    match expr {
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Name(name) => {
            module.get(name).ok_or_else(|| ScriptError::Undefined(name.clone()))
        }
        Expr::Attr(base, attr) => {
            let base = eval_expr(base, module, host)?;
            attribute(&base, attr, host)
        }
    }
}

fn attribute(value: &Value, attr: &str, host: &ModuleHost) -> Result<Value, ScriptError> {
    match value {
        Value::ModuleRef(name) => {
            let target = host
                .module(name)
                .ok_or_else(|| ScriptError::ModuleNotFound(name.clone()))?;
            target.get(attr).ok_or_else(|| ScriptError::Attribute {
                target: format!("module '{name}'"),
                attr: attr.to_string(),
            })
        }
        Value::Class(class) => {
            // Class attributes are its parameters, evaluated in the
            // declaring module's namespace.
            let expr = class
                .params
                .iter()
                .find(|(key, _)| key == attr)
                .map(|(_, expr)| expr)
                .ok_or_else(|| ScriptError::Attribute {
                    target: format!("class '{}'", class.name),
                    attr: attr.to_string(),
                })?;
            let owner = host
                .module(&class.module)
                .ok_or_else(|| ScriptError::ModuleNotFound(class.module.clone()))?;
            eval_expr(expr, &owner, host)
        }
        other => Err(ScriptError::Attribute {
            target: other.type_name().to_string(),
            attr: attr.to_string(),
        }),
    }
}

/// Bind a symbol from an imported module, falling back to resolving it
/// as a submodule when the name is not in the namespace.
fn import_symbol(
    imported: &Arc<Module>,
    name: &str,
    host: &ModuleHost,
) -> Result<Value, ScriptError> {
    if let Some(value) = imported.get(name) {
        return Ok(value);
    }
    let submodule = format!("{}.{name}", imported.name());
    match host.resolve(&submodule) {
        Ok(_) => Ok(Value::ModuleRef(submodule)),
        Err(ScriptError::ModuleNotFound(_)) => Err(ScriptError::ImportName {
            name: name.to_string(),
            module: imported.name().to_string(),
        }),
        Err(other) => Err(other),
    }
}

/// Turn a possibly-relative import target into an absolute logical
/// name. Level 1 is the current package; each extra dot walks one
/// package up.
fn resolve_import_target(
    module: &Module,
    level: usize,
    target: &str,
) -> Result<String, ScriptError> {
    if level == 0 {
        return Ok(target.to_string());
    }

    let mut base: Vec<&str> = if module.is_package() {
        module.name().split('.').collect()
    } else if module.package_name().is_empty() {
        Vec::new()
    } else {
        module.package_name().split('.').collect()
    };

    for _ in 1..level {
        if base.pop().is_none() {
            return Err(ScriptError::RelativeImport(module.name().to_string()));
        }
    }
    if base.is_empty() {
        return Err(ScriptError::RelativeImport(module.name().to_string()));
    }

    if target.is_empty() {
        Ok(base.join("."))
    } else {
        Ok(format!("{}.{target}", base.join(".")))
    }
}

fn execute_decorator(call: &DecoratorCall, host: &ModuleHost) {
    let Some(method) = call.target.strip_prefix("AgentServer.") else {
        trace!(target = %call.target, "Ignoring decorator");
        return;
    };
    let kind = match method {
        "custom_action" => CapabilityKind::Action,
        "custom_recognition" => CapabilityKind::Recognition,
        _ => {
            trace!(target = %call.target, "Ignoring unknown framework decorator");
            return;
        }
    };
    if let Some(name) = call.argument.as_deref() {
        host.framework().self_register(kind, name);
    }
}

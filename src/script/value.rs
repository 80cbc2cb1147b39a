//! Runtime values bound in module namespaces.

use std::fmt;
use std::sync::Arc;

use super::parser::Expr;

/// A value bound to a name in a module namespace.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A class declared by a plugin script.
    Class(Arc<ClassDef>),
    /// A reference to another module, by logical name. Stored by name
    /// rather than by pointer so mutually-importing modules do not form
    /// reference cycles; the module itself lives in the host table.
    ModuleRef(String),
    /// A symbol provided by a builtin module (e.g. `CustomAction`).
    Builtin(&'static str),
}

impl Value {
    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Class(_) => "class",
            Self::ModuleRef(_) => "module",
            Self::Builtin(_) => "builtin",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Class(c) => write!(f, "<class {}.{}>", c.module, c.name),
            Self::ModuleRef(m) => write!(f, "<module {m}>"),
            Self::Builtin(name) => write!(f, "<builtin {name}>"),
        }
    }
}

/// A class declared by a plugin script, bound into its module's
/// namespace the moment the declaration executes.
///
/// Parameter expressions stay unevaluated until instantiation, so a
/// class can reference names that only become bound later in the load
/// cycle; evaluation failures surface as per-declaration registration
/// errors, not load errors.
#[derive(Debug)]
pub struct ClassDef {
    /// Declared class name.
    pub name: String,
    /// Base class name from the header, if any.
    pub base: Option<String>,
    /// Logical name of the module that declared this class.
    pub module: String,
    /// Parameter assignments from the class body.
    pub params: Vec<(String, Expr)>,
}

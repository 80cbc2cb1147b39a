//! The plugin script engine.
//!
//! Plugin capabilities are written in a small line-oriented script
//! language (`.cap` files). This module provides everything needed to
//! turn a script source into a live module namespace:
//!
//! - [`parser`]: source text to statements
//! - [`host`]: the module table and resolution chain
//! - [`exec`]: statement execution against a module namespace
//!
//! The language is deliberately tiny. A script consists of top-level
//! imports, bindings, decorator lines, and class declarations:
//!
//! ```text
//! from agent.custom_action import CustomAction
//! from util.timing import DEFAULT_DELAY
//!
//! GREETING = "hello"
//!
//! @AgentServer.custom_action("do_greet")
//! class Greet(CustomAction):
//!     delay = DEFAULT_DELAY
//!     message = GREETING
//! ```
//!
//! Imports trigger recursive module resolution through the
//! [`host::ModuleHost`], which is what makes mutual imports between
//! plugin files work: a module is visible in the global table before
//! its body finishes executing, so the other side of a cycle can
//! already see its bound names.

pub mod error;
pub mod exec;
pub mod host;
pub mod parser;
pub mod value;

pub use error::ScriptError;
pub use exec::{eval_expr, execute};
pub use host::{FrameworkHooks, HookGuard, Module, ModuleHost, NullFramework, ResolveHook};
pub use parser::{parse_source, ClassDecl, DecoratorCall, Expr, Stmt};
pub use value::{ClassDef, Value};

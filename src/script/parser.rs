//! Parser for the plugin script language.
//!
//! The language is line-oriented: every statement occupies one line,
//! except class declarations, whose bodies are the following lines at a
//! deeper indentation. `#` starts a comment outside string literals.
//!
//! Top-level statements must start at column zero. Supported forms:
//!
//! ```text
//! import util.timing                    # binds `timing`
//! import util.timing as t
//! from util.timing import DELAY as D
//! from .sibling import Helper           # relative to the package
//! NAME = "value"
//! @AgentServer.custom_action("name")
//! class Foo(CustomAction):
//!     delay = 500
//! pass
//! ```

use super::error::ScriptError;

/// A parsed statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `import a.b` / `import a.b as x`: binds the final segment (or
    /// the alias) to a reference to the resolved module.
    Import { target: String, alias: Option<String> },
    /// `from a.b import X as Y, Z`. `level` counts leading dots of a
    /// relative target (`from .sib import X` has level 1).
    FromImport { module: String, level: usize, names: Vec<(String, Option<String>)> },
    /// `NAME = expr`.
    Assign { name: String, value: Expr },
    /// A class declaration with its parameter body.
    Class(ClassDecl),
    /// A `@target("arg")` decorator line.
    Decorator(DecoratorCall),
    /// `pass`.
    Pass,
}

/// A class declaration header plus its parameter assignments.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    /// Declared class name.
    pub name: String,
    /// Base class name from the header, recorded textually.
    pub base: Option<String>,
    /// Parameter assignments from the body, in declaration order.
    /// Expressions are kept unevaluated until instantiation.
    pub body: Vec<(String, Expr)>,
}

/// A decorator invocation line.
#[derive(Debug, Clone)]
pub struct DecoratorCall {
    /// Dotted decorator target, e.g. `AgentServer.custom_action`.
    pub target: String,
    /// The single string-literal argument, when present.
    pub argument: Option<String>,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A bare name looked up in the current namespace.
    Name(String),
    /// Dotted attribute access, e.g. `other.Foo`.
    Attr(Box<Expr>, String),
}

/// Parse a complete script source into statements.
pub fn parse_source(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let lines: Vec<&str> = source.lines().collect();
    let mut stmts = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = strip_comment(lines[i]);
        let trimmed = line.trim();
        let lineno = i + 1;

        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        if indent_of(&line) > 0 {
            return Err(parse_error(lineno, "unexpected indentation"));
        }

        if let Some(rest) = trimmed.strip_prefix("import ") {
            stmts.push(parse_import(rest.trim(), lineno)?);
            i += 1;
        } else if let Some(rest) = trimmed.strip_prefix("from ") {
            stmts.push(parse_from_import(rest.trim(), lineno)?);
            i += 1;
        } else if let Some(rest) = trimmed.strip_prefix('@') {
            stmts.push(Stmt::Decorator(parse_decorator(rest.trim(), lineno)?));
            i += 1;
        } else if let Some(rest) = trimmed.strip_prefix("class ") {
            let (decl, next) = parse_class(rest.trim(), &lines, i)?;
            stmts.push(Stmt::Class(decl));
            i = next;
        } else if trimmed == "pass" {
            stmts.push(Stmt::Pass);
            i += 1;
        } else if let Some((name, expr)) = split_assignment(trimmed) {
            stmts.push(Stmt::Assign {
                name: parse_identifier(name, lineno)?,
                value: parse_expr(expr, lineno)?,
            });
            i += 1;
        } else {
            return Err(parse_error(lineno, &format!("unrecognized statement: {trimmed}")));
        }
    }

    Ok(stmts)
}

/// Parse a single expression string.
pub fn parse_expr(input: &str, lineno: usize) -> Result<Expr, ScriptError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(parse_error(lineno, "empty expression"));
    }

    if trimmed.starts_with('"') {
        return parse_string_literal(trimmed, lineno).map(Expr::Str);
    }

    match trimmed {
        "true" => return Ok(Expr::Bool(true)),
        "false" => return Ok(Expr::Bool(false)),
        _ => {}
    }

    if trimmed.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Expr::Int(n));
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Ok(Expr::Float(f));
        }
        return Err(parse_error(lineno, &format!("invalid numeric literal: {trimmed}")));
    }

    parse_dotted_reference(trimmed, lineno)
}

fn parse_import(rest: &str, lineno: usize) -> Result<Stmt, ScriptError> {
    let (target, alias) = split_alias(rest);
    let target = parse_dotted_name(target, lineno)?;
    let alias = alias.map(|a| parse_identifier(a, lineno)).transpose()?;
    Ok(Stmt::Import { target, alias })
}

fn parse_from_import(rest: &str, lineno: usize) -> Result<Stmt, ScriptError> {
    let Some((target, names)) = rest.split_once(" import ") else {
        return Err(parse_error(lineno, "expected 'import' in from-import"));
    };

    let target = target.trim();
    let level = target.chars().take_while(|&c| c == '.').count();
    let module = &target[level..];
    let module = if module.is_empty() {
        String::new()
    } else {
        parse_dotted_name(module, lineno)?
    };
    if level == 0 && module.is_empty() {
        return Err(parse_error(lineno, "missing module in from-import"));
    }

    let mut parsed = Vec::new();
    for part in names.split(',') {
        let (name, alias) = split_alias(part.trim());
        let name = parse_identifier(name, lineno)?;
        let alias = alias.map(|a| parse_identifier(a, lineno)).transpose()?;
        parsed.push((name, alias));
    }
    if parsed.is_empty() {
        return Err(parse_error(lineno, "empty import list"));
    }

    Ok(Stmt::FromImport { module, level, names: parsed })
}

fn parse_decorator(rest: &str, lineno: usize) -> Result<DecoratorCall, ScriptError> {
    let (target, args) = match rest.split_once('(') {
        Some((target, args)) => (target.trim(), Some(args)),
        None => (rest, None),
    };
    let target = parse_dotted_name(target, lineno)?;

    let argument = match args {
        None => None,
        Some(args) => {
            let Some(inner) = args.trim_end().strip_suffix(')') else {
                return Err(parse_error(lineno, "unterminated decorator arguments"));
            };
            let inner = inner.trim();
            if inner.starts_with('"') {
                // Only a single string-literal argument carries meaning;
                // anything else is preserved as an argument-less call.
                parse_string_literal(inner, lineno).ok()
            } else {
                None
            }
        }
    };

    Ok(DecoratorCall { target, argument })
}

fn parse_class(
    header: &str,
    lines: &[&str],
    index: usize,
) -> Result<(ClassDecl, usize), ScriptError> {
    let lineno = index + 1;
    let Some(header) = header.trim_end().strip_suffix(':') else {
        return Err(parse_error(lineno, "expected ':' after class header"));
    };

    let (name, base) = match header.split_once('(') {
        Some((name, base)) => {
            let Some(base) = base.trim_end().strip_suffix(')') else {
                return Err(parse_error(lineno, "unterminated base class list"));
            };
            let base = base.trim();
            let base = if base.is_empty() {
                None
            } else {
                Some(parse_dotted_name(base, lineno)?)
            };
            (name.trim(), base)
        }
        None => (header.trim(), None),
    };
    let name = parse_identifier(name, lineno)?;

    let header_indent = indent_of(lines[index]);
    let mut body = Vec::new();
    let mut j = index + 1;

    while j < lines.len() {
        let line = strip_comment(lines[j]);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            j += 1;
            continue;
        }
        if indent_of(&line) <= header_indent {
            break;
        }

        if trimmed == "pass" {
            j += 1;
            continue;
        }
        let Some((key, expr)) = split_assignment(trimmed) else {
            return Err(parse_error(j + 1, &format!("invalid class body line: {trimmed}")));
        };
        body.push((parse_identifier(key, j + 1)?, parse_expr(expr, j + 1)?));
        j += 1;
    }

    Ok((ClassDecl { name, base, body }, j))
}

/// Split `name = expr`, rejecting comparison operators.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let idx = line.find('=')?;
    if line.as_bytes().get(idx + 1) == Some(&b'=') {
        return None;
    }
    Some((line[..idx].trim(), line[idx + 1..].trim()))
}

/// Split a trailing `as alias` clause.
fn split_alias(input: &str) -> (&str, Option<&str>) {
    match input.split_once(" as ") {
        Some((target, alias)) => (target.trim(), Some(alias.trim())),
        None => (input.trim(), None),
    }
}

fn parse_dotted_reference(input: &str, lineno: usize) -> Result<Expr, ScriptError> {
    let mut parts = input.split('.');
    let first = parse_identifier(parts.next().unwrap_or(""), lineno)?;
    let mut expr = Expr::Name(first);
    for part in parts {
        let attr = parse_identifier(part, lineno)?;
        expr = Expr::Attr(Box::new(expr), attr);
    }
    Ok(expr)
}

fn parse_dotted_name(input: &str, lineno: usize) -> Result<String, ScriptError> {
    let input = input.trim();
    for part in input.split('.') {
        parse_identifier(part, lineno)?;
    }
    Ok(input.to_string())
}

fn parse_identifier(input: &str, lineno: usize) -> Result<String, ScriptError> {
    let valid = !input.is_empty()
        && !input.starts_with(|c: char| c.is_ascii_digit())
        && input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(input.to_string())
    } else {
        Err(parse_error(lineno, &format!("invalid identifier: '{input}'")))
    }
}

fn parse_string_literal(input: &str, lineno: usize) -> Result<String, ScriptError> {
    let mut chars = input.chars();
    if chars.next() != Some('"') {
        return Err(parse_error(lineno, "expected string literal"));
    }

    let mut out = String::new();
    let mut closed = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                closed = true;
                break;
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return Err(parse_error(lineno, "unterminated escape in string")),
            },
            other => out.push(other),
        }
    }

    if !closed {
        return Err(parse_error(lineno, "unterminated string literal"));
    }
    if !chars.as_str().trim().is_empty() {
        return Err(parse_error(lineno, "trailing characters after string literal"));
    }
    Ok(out)
}

/// Remove a `#` comment, ignoring `#` inside string literals.
fn strip_comment(line: &str) -> String {
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            '\\' if in_string => {
                escaped = !escaped;
                continue;
            }
            '"' if !escaped => in_string = !in_string,
            '#' if !in_string => return line[..idx].to_string(),
            _ => {}
        }
        escaped = false;
    }
    line.to_string()
}

/// Count leading whitespace characters (a tab counts as one).
fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn parse_error(line: usize, message: &str) -> ScriptError {
    ScriptError::Parse { line, message: message.to_string() }
}

//! Annotation scanner: capability declarations by text inspection.
//!
//! Before any plugin code runs, every registered file is scanned line
//! by line for the framework's capability markers. A marker line names
//! the capability; the *next non-empty* line must open the class that
//! provides it. Nothing is executed here; the output is the static
//! worklist the registrar binds to live classes after loading.
//!
//! The whole-line match is deliberately simple and shares the known
//! limitation of the marker-stripping filter: a marker call split
//! across lines or using non-double quoting is not recognized.

use std::fs;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::scanner::ModuleRegistry;
use crate::capability::CapabilityKind;

static ACTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^@AgentServer\.custom_action\("([^"]+)"\)"#).unwrap());

static RECOGNITION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^@AgentServer\.custom_recognition\("([^"]+)"\)"#).unwrap());

/// One capability declaration discovered by the text scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDeclaration {
    /// Capability kind the marker declared.
    pub kind: CapabilityKind,
    /// External-facing capability name from the marker argument.
    pub name: String,
    /// Name of the class on the following line.
    pub class_name: String,
    /// Logical name of the module declaring it.
    pub module: String,
}

/// Scan every registered file for capability declarations.
///
/// Output order is registry order then line order; deterministic, so
/// colliding names always resolve the same way. Unreadable files and
/// malformed declarations are logged and skipped.
pub fn scan_annotations(registry: &ModuleRegistry) -> Vec<CapabilityDeclaration> {
    let mut declarations = Vec::new();

    for record in registry.iter() {
        let content = match fs::read_to_string(&record.source_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    module = %record.logical_name,
                    path = %record.source_path.display(),
                    error = %e,
                    "Skipping unreadable plugin file"
                );
                continue;
            }
        };

        let lines: Vec<&str> = content.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            let (kind, name) = if let Some(captures) = ACTION_MARKER.captures(trimmed) {
                (CapabilityKind::Action, captures[1].to_string())
            } else if let Some(captures) = RECOGNITION_MARKER.captures(trimmed) {
                (CapabilityKind::Recognition, captures[1].to_string())
            } else {
                continue;
            };

            match class_name_after(&lines[index + 1..]) {
                Some(class_name) => declarations.push(CapabilityDeclaration {
                    kind,
                    name,
                    class_name,
                    module: record.logical_name.clone(),
                }),
                None => warn!(
                    module = %record.logical_name,
                    line = index + 1,
                    capability = %name,
                    "Capability marker is not followed by a class declaration"
                ),
            }
        }
    }

    declarations
}

/// Extract the class name from the first non-empty line, if it is a
/// class declaration. The name is the text up to the first `(` or `:`.
fn class_name_after(rest: &[&str]) -> Option<String> {
    let line = rest.iter().map(|l| l.trim()).find(|l| !l.is_empty())?;
    let decl = line.strip_prefix("class ")?;
    let name = decl.split(['(', ':']).next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::scanner::scan_modules;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scan(root: &Path) -> Vec<CapabilityDeclaration> {
        scan_annotations(&scan_modules(root).unwrap())
    }

    #[test]
    fn test_action_and_recognition_markers() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "plug.cap",
            "@AgentServer.custom_action(\"do_foo\")\nclass Foo(CustomAction):\n    pass\n\
             @AgentServer.custom_recognition(\"find_bar\")\nclass Bar(CustomRecognition):\n    pass\n",
        );

        let declarations = scan(temp.path());
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].kind, CapabilityKind::Action);
        assert_eq!(declarations[0].name, "do_foo");
        assert_eq!(declarations[0].class_name, "Foo");
        assert_eq!(declarations[1].kind, CapabilityKind::Recognition);
        assert_eq!(declarations[1].class_name, "Bar");
        assert_eq!(declarations[1].module, "plug");
    }

    #[test]
    fn test_blank_lines_between_marker_and_class() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "plug.cap",
            "@AgentServer.custom_action(\"do_foo\")\n\n\nclass Foo:\n    pass\n",
        );

        let declarations = scan(temp.path());
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].class_name, "Foo");
    }

    #[test]
    fn test_marker_without_class_is_dropped() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "plug.cap",
            "@AgentServer.custom_action(\"orphan\")\nDELAY = 1\n",
        );

        assert!(scan(temp.path()).is_empty());
    }

    #[test]
    fn test_marker_at_end_of_file_is_dropped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "plug.cap", "@AgentServer.custom_action(\"tail\")\n");

        assert!(scan(temp.path()).is_empty());
    }

    #[test]
    fn test_class_name_extraction_without_base() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "plug.cap",
            "@AgentServer.custom_recognition(\"find_it\")\nclass Finder:\n    pass\n",
        );

        let declarations = scan(temp.path());
        assert_eq!(declarations[0].class_name, "Finder");
    }

    #[test]
    fn test_indented_marker_matches() {
        // Markers are matched on the trimmed line, as in the original
        // framework convention.
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "plug.cap",
            "  @AgentServer.custom_action(\"do_foo\")\nclass Foo:\n    pass\n",
        );

        assert_eq!(scan(temp.path()).len(), 1);
    }

    #[test]
    fn test_order_is_registry_then_line() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "b.cap",
            "@AgentServer.custom_action(\"second\")\nclass S:\n    pass\n",
        );
        write(
            temp.path(),
            "a.cap",
            "@AgentServer.custom_action(\"first\")\nclass F:\n    pass\n",
        );

        let declarations = scan(temp.path());
        assert_eq!(declarations[0].name, "first");
        assert_eq!(declarations[1].name, "second");
    }
}

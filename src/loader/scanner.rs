//! Source scanner: plugin files to a module registry.
//!
//! Walks the plugin root for `.cap` files and derives each file's
//! dotted logical module name from its path. A `__init__.cap` package
//! marker names its containing directory; a marker directly at the
//! root has no logical name and is skipped. The scan reads directory
//! metadata only, never file contents.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::LoaderError;
use super::{PACKAGE_MARKER, PLUGIN_EXTENSION};

/// One discovered plugin file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Dotted logical module name; unique within a registry.
    pub logical_name: String,
    /// Absolute or root-relative path to the source file.
    pub source_path: PathBuf,
    /// Whether this record is a package marker.
    pub is_package: bool,
}

/// The module registry built by one scan.
///
/// Keys are logical names; iteration order is sorted by name, which
/// fixes the load order and makes annotation output deterministic.
/// Immutable for the duration of a load cycle, discarded afterwards.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    records: BTreeMap<String, ModuleRecord>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, keyed by its logical name.
    pub fn insert(&mut self, record: ModuleRecord) {
        self.records.insert(record.logical_name.clone(), record);
    }

    /// Look up a record by logical name.
    pub fn get(&self, logical_name: &str) -> Option<&ModuleRecord> {
        self.records.get(logical_name)
    }

    /// Whether a logical name is registered.
    pub fn contains(&self, logical_name: &str) -> bool {
        self.records.contains_key(logical_name)
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.values()
    }

    /// Iterate logical names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

/// Scan a plugin root into a module registry.
pub fn scan_modules(root: &Path) -> Result<ModuleRegistry, LoaderError> {
    if !root.is_dir() {
        return Err(LoaderError::RootNotFound(root.to_path_buf()));
    }

    let mut registry = ModuleRegistry::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(OsStr::to_str) != Some(PLUGIN_EXTENSION) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            warn!(path = %path.display(), "Skipping file outside plugin root");
            continue;
        };

        let is_package = path.file_name() == Some(OsStr::new(PACKAGE_MARKER));
        let logical = if is_package {
            let parent = relative.parent().unwrap_or_else(|| Path::new(""));
            if parent.as_os_str().is_empty() {
                // A package marker at the root names nothing.
                continue;
            }
            dotted_name(parent)
        } else {
            dotted_name(&relative.with_extension(""))
        };

        let Some(logical_name) = logical else {
            warn!(path = %path.display(), "Skipping file with unmappable path");
            continue;
        };

        debug!(module = %logical_name, path = %path.display(), "Registered plugin module");
        registry.insert(ModuleRecord {
            logical_name,
            source_path: path.to_path_buf(),
            is_package,
        });
    }

    Ok(registry)
}

/// Dotted form of a relative path; `None` for paths with non-normal or
/// non-UTF-8 components.
fn dotted_name(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

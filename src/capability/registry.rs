//! Name-keyed registries of instantiated capabilities.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::{CapabilityKind, CapabilitySink, ScriptCapability};

/// The in-process capability registries, one map per kind.
///
/// Entries live for the process lifetime and are read-only to the
/// execution engine; only a full reload cycle replaces them.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    actions: HashMap<String, Arc<ScriptCapability>>,
    recognitions: HashMap<String, Arc<ScriptCapability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: CapabilityKind) -> &HashMap<String, Arc<ScriptCapability>> {
        match kind {
            CapabilityKind::Action => &self.actions,
            CapabilityKind::Recognition => &self.recognitions,
        }
    }

    fn map_mut(&mut self, kind: CapabilityKind) -> &mut HashMap<String, Arc<ScriptCapability>> {
        match kind {
            CapabilityKind::Action => &mut self.actions,
            CapabilityKind::Recognition => &mut self.recognitions,
        }
    }

    /// Look up a capability by kind and declared name.
    pub fn get(&self, kind: CapabilityKind, name: &str) -> Option<&Arc<ScriptCapability>> {
        self.map(kind).get(name)
    }

    /// Look up an action provider.
    pub fn action(&self, name: &str) -> Option<&Arc<ScriptCapability>> {
        self.get(CapabilityKind::Action, name)
    }

    /// Look up a recognition provider.
    pub fn recognition(&self, name: &str) -> Option<&Arc<ScriptCapability>> {
        self.get(CapabilityKind::Recognition, name)
    }

    /// Registered names for a kind, sorted.
    pub fn names(&self, kind: CapabilityKind) -> Vec<&str> {
        let mut names: Vec<&str> = self.map(kind).keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registrations for a kind.
    pub fn count(&self, kind: CapabilityKind) -> usize {
        self.map(kind).len()
    }

    /// Total registrations across both kinds.
    pub fn total(&self) -> usize {
        self.actions.len() + self.recognitions.len()
    }

    /// Whether both registries are empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.recognitions.is_empty()
    }
}

impl CapabilitySink for CapabilityRegistry {
    fn register(&mut self, kind: CapabilityKind, name: &str, capability: ScriptCapability) {
        let previous = self.map_mut(kind).insert(name.to_string(), Arc::new(capability));
        if let Some(previous) = previous {
            // Last registration wins; the earlier provider is dropped.
            warn!(
                kind = %kind,
                name = %name,
                replaced = %previous.class_name(),
                "Duplicate capability name, later registration replaces the earlier one"
            );
        }
    }
}

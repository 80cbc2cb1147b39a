//! Load Cycle Integration Tests
//!
//! Exercises full scan → annotate → load → register cycles against
//! on-disk plugin trees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use caprun::capability::{CapabilityKind, CapabilityRegistry};
use caprun::config::InterfaceConfig;
use caprun::loader::PluginLoader;
use caprun::script::{FrameworkHooks, ModuleHost, ScriptError};
use caprun::Value;

/// Framework stub that counts self-registration side effects.
struct CountingFramework(AtomicUsize);

impl CountingFramework {
    fn new() -> Arc<Self> {
        Arc::new(Self(AtomicUsize::new(0)))
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl FrameworkHooks for CountingFramework {
    fn self_register(&self, _kind: CapabilityKind, _name: &str) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn run_cycle(temp: &TempDir) -> (ModuleHost, CapabilityRegistry, caprun::LoadReport) {
    let host = ModuleHost::new();
    let mut registry = CapabilityRegistry::new();
    let report = PluginLoader::new(temp.path()).load(&host, &mut registry).unwrap();
    (host, registry, report)
}

// ============================================================================
// End-To-End Scenario
// ============================================================================

#[test]
fn test_end_to_end_two_plugins() {
    let temp = TempDir::new().unwrap();
    temp.child("a.cap")
        .write_str(
            "from agent.custom_action import CustomAction\n\
             \n\
             @AgentServer.custom_action(\"do_foo\")\n\
             class Foo(CustomAction):\n\
             \x20   delay = 100\n",
        )
        .unwrap();
    temp.child("b.cap")
        .write_str(
            "from agent.custom_recognition import CustomRecognition\n\
             from a import Foo\n\
             \n\
             @AgentServer.custom_recognition(\"find_bar\")\n\
             class Bar(CustomRecognition):\n\
             \x20   partner = Foo.delay\n",
        )
        .unwrap();

    let (_host, registry, report) = run_cycle(&temp);

    assert_eq!(report.modules, 2);
    assert_eq!(report.loaded, 2);
    assert!(report.failed.is_empty());
    assert_eq!(report.registered, 2);
    assert_eq!(report.skipped, 0);

    let action = registry.action("do_foo").expect("action registered");
    assert_eq!(action.class_name(), "Foo");
    assert_eq!(action.module(), "a");
    assert!(matches!(action.param("delay"), Some(Value::Int(100))));

    let recognition = registry.recognition("find_bar").expect("recognition registered");
    assert_eq!(recognition.class_name(), "Bar");
    assert!(matches!(recognition.param("partner"), Some(Value::Int(100))));
}

// ============================================================================
// Cycle Tolerance
// ============================================================================

#[test]
fn test_mutual_imports_both_load() {
    let temp = TempDir::new().unwrap();
    // a binds FOO before importing b; b binds BAR before importing a.
    temp.child("a.cap")
        .write_str("FOO = \"from_a\"\nfrom b import BAR\nCOMBINED = BAR\n")
        .unwrap();
    temp.child("b.cap").write_str("BAR = 7\nfrom a import FOO\n").unwrap();

    let (host, _registry, report) = run_cycle(&temp);

    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    let a = host.module("a").unwrap();
    let b = host.module("b").unwrap();
    assert!(matches!(a.get("COMBINED"), Some(Value::Int(7))));
    assert!(matches!(b.get("FOO"), Some(Value::Str(s)) if s == "from_a"));
}

#[test]
fn test_forward_reference_across_cycle_fails() {
    let temp = TempDir::new().unwrap();
    // Each file imports before binding, so whichever side enters the
    // cycle second always sees an empty namespace. The cycle is
    // tolerant to mutual imports, not to forward references.
    temp.child("a.cap").write_str("from b import BAR\nLATE = 1\n").unwrap();
    temp.child("b.cap").write_str("from a import LATE\nBAR = 7\n").unwrap();

    let (host, _registry, report) = run_cycle(&temp);

    assert_eq!(report.loaded, 0);
    assert_eq!(report.failed.len(), 2);
    assert!(host.module("a").is_none());
    assert!(host.module("b").is_none());
}

// ============================================================================
// Marker Stripping
// ============================================================================

#[test]
fn test_self_registration_marker_never_executes() {
    let temp = TempDir::new().unwrap();
    temp.child("plug.cap")
        .write_str(
            "from agent.server import AgentServer\n\
             from agent.custom_action import CustomAction\n\
             \n\
             @AgentServer.custom_action(\"do_foo\")\n\
             class Foo(CustomAction):\n\
             \x20   pass\n",
        )
        .unwrap();

    let framework = CountingFramework::new();
    let host = ModuleHost::with_framework(framework.clone());
    let mut registry = CapabilityRegistry::new();
    let report = PluginLoader::new(temp.path()).load(&host, &mut registry).unwrap();

    // The explicit registrar path ran; the framework's own did not.
    assert_eq!(framework.count(), 0);
    assert_eq!(report.registered, 1);
    assert!(registry.action("do_foo").is_some());
}

// ============================================================================
// Hook Cleanup
// ============================================================================

#[test]
fn test_hook_removed_after_successful_cycle() {
    let temp = TempDir::new().unwrap();
    temp.child("plug.cap").write_str("X = 1\n").unwrap();

    let (host, _registry, _report) = run_cycle(&temp);
    assert_eq!(host.hook_count(), 0);

    // A plugin added after the cycle is invisible: nothing intercepts
    // resolution for it any more.
    temp.child("late.cap").write_str("Y = 2\n").unwrap();
    assert!(matches!(host.resolve("late"), Err(ScriptError::ModuleNotFound(_))));
}

#[test]
fn test_hook_removed_after_failing_cycle() {
    let temp = TempDir::new().unwrap();
    temp.child("broken.cap").write_str("this is not a statement\n").unwrap();

    let (host, _registry, report) = run_cycle(&temp);
    assert_eq!(report.failed, vec!["broken".to_string()]);
    assert_eq!(host.hook_count(), 0);
}

// ============================================================================
// Partial-Failure Isolation
// ============================================================================

#[test]
fn test_broken_plugin_does_not_block_siblings() {
    let temp = TempDir::new().unwrap();
    temp.child("broken.cap").write_str("class Oops(\n").unwrap();
    temp.child("good.cap")
        .write_str(
            "@AgentServer.custom_action(\"do_good\")\n\
             class Good:\n\
             \x20   pass\n",
        )
        .unwrap();

    let (host, registry, report) = run_cycle(&temp);

    assert_eq!(report.failed, vec!["broken".to_string()]);
    assert_eq!(report.loaded, 1);
    assert!(host.module("good").is_some());
    assert!(host.module("broken").is_none());
    assert_eq!(registry.action("do_good").unwrap().class_name(), "Good");
}

#[test]
fn test_capabilities_of_failed_module_are_skipped() {
    let temp = TempDir::new().unwrap();
    temp.child("broken.cap")
        .write_str(
            "@AgentServer.custom_action(\"do_broken\")\n\
             class Broken:\n\
             \x20   pass\n\
             X = UNDEFINED_NAME\n",
        )
        .unwrap();

    let (_host, registry, report) = run_cycle(&temp);

    // The declaration was discovered by the text scan, but the module
    // failed to execute, so it never registers.
    assert_eq!(report.declared, 1);
    assert_eq!(report.registered, 0);
    assert_eq!(report.skipped, 1);
    assert!(registry.action("do_broken").is_none());
}

// ============================================================================
// Duplicate Names
// ============================================================================

#[test]
fn test_duplicate_action_name_last_registration_wins() {
    let temp = TempDir::new().unwrap();
    temp.child("a.cap")
        .write_str("@AgentServer.custom_action(\"dup\")\nclass First:\n    pass\n")
        .unwrap();
    temp.child("b.cap")
        .write_str("@AgentServer.custom_action(\"dup\")\nclass Second:\n    pass\n")
        .unwrap();

    let (_host, registry, report) = run_cycle(&temp);

    assert_eq!(report.registered, 2);
    assert_eq!(registry.count(CapabilityKind::Action), 1);
    assert_eq!(registry.action("dup").unwrap().class_name(), "Second");
}

// ============================================================================
// Packages & Relative Imports
// ============================================================================

#[test]
fn test_package_relative_import() {
    let temp = TempDir::new().unwrap();
    temp.child("pkg/__init__.cap").write_str("").unwrap();
    temp.child("pkg/util.cap").write_str("HELPER = \"ready\"\n").unwrap();
    temp.child("pkg/action.cap")
        .write_str(
            "from .util import HELPER\n\
             \n\
             @AgentServer.custom_action(\"do_pkg\")\n\
             class PkgAction:\n\
             \x20   helper = HELPER\n",
        )
        .unwrap();

    let (_host, registry, report) = run_cycle(&temp);

    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    let action = registry.action("do_pkg").unwrap();
    assert_eq!(action.module(), "pkg.action");
    assert!(matches!(action.param("helper"), Some(Value::Str(s)) if s == "ready"));
}

#[test]
fn test_from_package_import_submodule() {
    let temp = TempDir::new().unwrap();
    temp.child("pkg/__init__.cap").write_str("").unwrap();
    temp.child("pkg/util.cap").write_str("LIMIT = 5\n").unwrap();
    temp.child("top.cap").write_str("from pkg import util\nN = util.LIMIT\n").unwrap();

    let (host, _registry, report) = run_cycle(&temp);

    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    let top = host.module("top").unwrap();
    assert!(matches!(top.get("N"), Some(Value::Int(5))));
}

// ============================================================================
// Interface Configuration
// ============================================================================

#[test]
fn test_plugin_root_from_interface_config() {
    let temp = TempDir::new().unwrap();
    temp.child("plugins/main.cap")
        .write_str("@AgentServer.custom_action(\"do_main\")\nclass Main:\n    pass\n")
        .unwrap();
    temp.child("interface.json")
        .write_str(
            r#"{"name": "demo", "agent": {"child_args": ["--serve", "{PROJECT_DIR}/plugins/main.cap"]}}"#,
        )
        .unwrap();

    let config = InterfaceConfig::from_file(&temp.path().join("interface.json")).unwrap();
    let loader = PluginLoader::from_interface(&config, temp.path()).unwrap();
    assert_eq!(loader.root(), temp.path().join("plugins"));

    let host = ModuleHost::new();
    let mut registry = CapabilityRegistry::new();
    let report = loader.load(&host, &mut registry).unwrap();
    assert_eq!(report.registered, 1);
    assert!(registry.action("do_main").is_some());
}

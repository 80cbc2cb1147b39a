//! Caprun - plugin capability loader for automation agents.
//!
//! Caprun discovers plugin scripts, resolves them through its module
//! host, and registers the capabilities they declare.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use caprun::capability::{CapabilityKind, CapabilityRegistry};
use caprun::config::{InterfaceConfig, INTERFACE_FILE};
use caprun::loader::{scan_annotations, scan_modules, PluginLoader};
use caprun::script::ModuleHost;

/// Plugin capability loader for automation agents
#[derive(Parser)]
#[command(name = "caprun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full plugin load cycle and show what registered (default)
    Load {
        /// Plugin root directory (overrides the interface configuration)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Interface configuration file
        #[arg(short, long, default_value = INTERFACE_FILE)]
        interface: PathBuf,
    },

    /// Scan a plugin root and show the module registry
    Scan {
        /// Directory to scan
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Show capability declarations without executing any plugin
    Annotations {
        /// Directory to scan
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        None => cmd_load(None, Path::new(INTERFACE_FILE))?,
        Some(Commands::Load { dir, interface }) => cmd_load(dir, &interface)?,
        Some(Commands::Scan { dir }) => cmd_scan(&dir)?,
        Some(Commands::Annotations { dir }) => cmd_annotations(&dir)?,
        Some(Commands::Completions { shell }) => cmd_completions(shell),
    }

    Ok(())
}

/// Run a full load cycle and print the outcome.
fn cmd_load(dir: Option<PathBuf>, interface: &Path) -> Result<()> {
    let loader = match dir {
        Some(dir) => PluginLoader::new(dir),
        None => {
            let config = InterfaceConfig::from_file(interface)
                .with_context(|| format!("reading {}", interface.display()))?;
            if let Some(name) = &config.name {
                println!("{name} {}", config.version.as_deref().unwrap_or(""));
            }
            let project_dir = std::env::current_dir()?;
            PluginLoader::from_interface(&config, &project_dir)?
        }
    };

    let host = ModuleHost::new();
    let mut registry = CapabilityRegistry::new();
    let report = loader.load(&host, &mut registry)?;

    println!(
        "Loaded {}/{} modules from {}",
        report.loaded,
        report.modules,
        loader.root().display()
    );
    for name in &report.failed {
        println!("  failed: {name}");
    }

    print_kind(&registry, CapabilityKind::Action);
    print_kind(&registry, CapabilityKind::Recognition);

    if report.skipped > 0 {
        println!("{} declaration(s) skipped, see log for details", report.skipped);
    }

    Ok(())
}

fn print_kind(registry: &CapabilityRegistry, kind: CapabilityKind) {
    let names = registry.names(kind);
    println!("{} {} provider(s):", names.len(), kind);
    for name in names {
        if let Some(capability) = registry.get(kind, name) {
            println!("  {name}  ({}.{})", capability.module(), capability.class_name());
        }
    }
}

/// Print the module registry for a plugin root.
fn cmd_scan(dir: &Path) -> Result<()> {
    let registry = scan_modules(dir)?;

    println!("{} module(s) under {}", registry.len(), dir.display());
    for record in registry.iter() {
        let marker = if record.is_package { "  [package]" } else { "" };
        println!("  {}  {}{marker}", record.logical_name, record.source_path.display());
    }

    Ok(())
}

/// Print discovered capability declarations without executing anything.
fn cmd_annotations(dir: &Path) -> Result<()> {
    let registry = scan_modules(dir)?;
    let declarations = scan_annotations(&registry);

    println!("{} declaration(s) under {}", declarations.len(), dir.display());
    for declaration in &declarations {
        println!(
            "  {}  {}  class {} in {}",
            declaration.kind, declaration.name, declaration.class_name, declaration.module
        );
    }

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

//! Kapps commands
//!
//! `kapps install` parses the configured manifests and installs every
//! present kapp, strictly in manifest order. `kapps destroy` removes them
//! in reverse order.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use stackform::lifecycle;
use stackform::manifest;
use stackform::output::{glyph, OutputConfig};
use stackform::provider;

use super::stack_args::StackArgs;

#[derive(Subcommand, Debug)]
pub enum KappsCommands {
    /// Install the kapps declared present in the manifests
    Install(KappsArgs),
    /// Destroy the kapps declared present in the manifests
    Destroy(KappsArgs),
}

#[derive(Args, Debug)]
pub struct KappsArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Pass APPROVED=true to the kapps' build files
    #[arg(long)]
    pub approved: bool,

    /// Show what would happen but don't touch anything
    #[arg(long)]
    pub dry_run: bool,

    /// Cache root for acquired kapp sources
    #[arg(long, value_name = "PATH", env = "STACKFORM_CACHE")]
    pub cache_dir: Option<PathBuf>,
}

pub fn execute(command: KappsCommands, output: &OutputConfig) -> Result<()> {
    match command {
        KappsCommands::Install(args) => run(args, output, false),
        KappsCommands::Destroy(args) => run(args, output, true),
    }
}

fn run(args: KappsArgs, output: &OutputConfig, destroy: bool) -> Result<()> {
    let stack = args.stack.resolve()?;
    stack.ensure_backend_ready()?;

    let manifest_paths: Vec<PathBuf> = stack
        .manifests
        .iter()
        .map(|path| stack.resolve_path(path))
        .collect();
    if manifest_paths.is_empty() {
        anyhow::bail!("no manifests configured; pass -m/--manifest or set 'manifests' in the stack file");
    }

    let kapps = manifest::parse_manifests(&manifest_paths)?;
    let provider = provider::new_provider(&stack)?;
    let cache_root = args.cache_dir.unwrap_or_else(default_cache_root);

    if destroy {
        lifecycle::destroy_kapps(
            &kapps,
            &stack,
            provider.as_ref(),
            &cache_root,
            args.approved,
            args.dry_run,
        )?;
    } else {
        lifecycle::install_kapps(
            &kapps,
            &stack,
            provider.as_ref(),
            &cache_root,
            args.approved,
            args.dry_run,
        )?;
    }

    let present = kapps.iter().filter(|k| k.should_be_present).count();
    println!(
        "{} {} {} kapp(s)",
        glyph(output, "✅", "[OK]"),
        if destroy { "Destroyed" } else { "Installed" },
        present
    );

    Ok(())
}

fn default_cache_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stackform")
        .join("cache")
}

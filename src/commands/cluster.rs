//! Cluster commands
//!
//! `cluster create` launches a cluster, either local or remote. If creating
//! a named stack, pass the stack name and the path to the config file it's
//! defined in:
//!
//! ```text
//! $ stackform cluster create --stack-name dev1 --stack-config ./stacks.yaml
//! ```
//!
//! Otherwise specify the provider, profile, etc. on the command line, or to
//! override values from the stack file. CLI args take precedence.

use anyhow::Result;
use clap::{Args, Subcommand};

use stackform::lifecycle;
use stackform::output::{glyph, OutputConfig};
use stackform::provider;
use stackform::provisioner;

use super::stack_args::StackArgs;

#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// Create a cluster and wait for it to become online and ready
    Create(CreateArgs),
    /// Converge an existing cluster with its configured specs
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Show what would happen but don't create a cluster
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Show what would happen but don't touch the cluster
    #[arg(long)]
    pub dry_run: bool,
}

pub fn execute(command: ClusterCommands, output: &OutputConfig) -> Result<()> {
    match command {
        ClusterCommands::Create(args) => execute_create(args, output),
        ClusterCommands::Update(args) => execute_update(args, output),
    }
}

fn execute_create(args: CreateArgs, output: &OutputConfig) -> Result<()> {
    let stack = args.stack.resolve()?;

    let provider = provider::new_provider(&stack)?;
    let provisioner = provisioner::new_provisioner(&stack.provisioner)?;

    let status =
        lifecycle::create_cluster(&stack, provider.as_ref(), provisioner.as_ref(), args.dry_run)?;

    if args.dry_run {
        println!(
            "{} Dry run complete for cluster '{}'",
            glyph(output, "✅", "[OK]"),
            stack.cluster
        );
    } else if status.is_ready {
        println!(
            "{} Cluster '{}' is online and ready",
            glyph(output, "✅", "[OK]"),
            stack.cluster
        );
    } else {
        println!(
            "{} Cluster '{}' is already online",
            glyph(output, "✅", "[OK]"),
            stack.cluster
        );
    }

    Ok(())
}

fn execute_update(args: UpdateArgs, output: &OutputConfig) -> Result<()> {
    let stack = args.stack.resolve()?;

    let provider = provider::new_provider(&stack)?;
    let provisioner = provisioner::new_provisioner(&stack.provisioner)?;

    provisioner.update(&stack, provider.as_ref(), args.dry_run)?;

    println!(
        "{} Cluster '{}' converged",
        glyph(output, "✅", "[OK]"),
        stack.cluster
    );

    Ok(())
}

//! Shared stack-resolution flags
//!
//! CLI args take precedence over values in stack config files; an empty
//! flag never overrides a configured value.

use std::path::PathBuf;

use clap::Args;

use stackform::error::Result;
use stackform::stack::{self, CliOverrides, StackConfig};

#[derive(Args, Debug, Default)]
pub struct StackArgs {
    /// Name of a stack to operate on (required when passing --stack-config)
    #[arg(short = 'n', long, value_name = "NAME")]
    pub stack_name: Option<String>,

    /// Path to a file defining stacks by name
    #[arg(short = 's', long = "stack-config", value_name = "PATH")]
    pub stack_config: Option<PathBuf>,

    /// Name of the provider, e.g. aws, local
    #[arg(short = 'p', long, value_name = "NAME")]
    pub provider: Option<String>,

    /// Name of the provisioner, e.g. kops, minikube
    #[arg(short = 'v', long, value_name = "NAME")]
    pub provisioner: Option<String>,

    /// Launch profile, e.g. dev, test, prod
    #[arg(short = 'l', long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Name of the cluster to operate on, e.g. dev1
    #[arg(short = 'c', long, value_name = "NAME")]
    pub cluster: Option<String>,

    /// Account identifier (for providers that support it)
    #[arg(short = 'a', long, value_name = "NAME")]
    pub account: Option<String>,

    /// Name of the region (for providers that support it)
    #[arg(short = 'r', long, value_name = "NAME")]
    pub region: Option<String>,

    /// YAML values file or directory to load (can specify multiple)
    #[arg(short = 'f', long = "vars-file-or-dir", value_name = "PATH")]
    pub vars_dirs: Vec<PathBuf>,

    /// YAML manifest file to load (can specify multiple)
    #[arg(short = 'm', long = "manifest", value_name = "PATH")]
    pub manifests: Vec<PathBuf>,

    /// Max number of seconds to wait for the cluster to come online
    #[arg(long, value_name = "SECONDS")]
    pub online_timeout: Option<u64>,

    /// Max number of seconds to wait for the cluster to become ready
    #[arg(long, value_name = "SECONDS")]
    pub ready_timeout: Option<u64>,
}

impl StackArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            provider: self.provider.clone().unwrap_or_default(),
            provisioner: self.provisioner.clone().unwrap_or_default(),
            profile: self.profile.clone().unwrap_or_default(),
            cluster: self.cluster.clone().unwrap_or_default(),
            account: self.account.clone().unwrap_or_default(),
            region: self.region.clone().unwrap_or_default(),
            vars_dirs: self.vars_dirs.clone(),
            manifests: self.manifests.clone(),
            online_timeout: self.online_timeout,
            ready_timeout: self.ready_timeout,
        }
    }

    /// Resolve the authoritative stack config for this invocation.
    pub fn resolve(&self) -> Result<StackConfig> {
        stack::resolve(
            self.stack_name.as_deref(),
            self.stack_config.as_deref(),
            &self.overrides(),
        )
    }
}

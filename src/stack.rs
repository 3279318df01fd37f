//! # Stack Configuration
//!
//! A stack is one named cluster-plus-kapps deployment. Stack files map
//! stack names to [`StackConfig`] objects:
//!
//! ```yaml
//! dev1:
//!   provider: aws
//!   provisioner: kops
//!   profile: dev
//!   cluster: dev1
//!   account: dev
//!   region: eu-west-1
//!   vars_dirs:
//!     - ./stacks
//!   manifests:
//!     - ./manifests/core.yaml
//! ```
//!
//! [`resolve`] is the single entry point that turns CLI arguments into the
//! authoritative configuration for a run: it loads the named stack from the
//! file (when given) and merges CLI overrides on top, where a non-empty
//! override always wins and an empty one never clobbers a configured value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::suggestions;

/// Default number of seconds to wait for a cluster to come online or become
/// ready.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// The resolved desired state for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Name of the stack, set from the CLI rather than the file.
    #[serde(skip)]
    pub name: String,

    /// Directory of the stack file, used to resolve relative paths.
    #[serde(skip)]
    pub dir: PathBuf,

    /// Provider backend, e.g. `aws` or `local`.
    pub provider: String,
    /// Provisioner backend, e.g. `kops` or `minikube`.
    pub provisioner: String,
    /// Launch profile, e.g. `dev`, `test`, `prod`.
    pub profile: String,
    /// Cluster identifier, e.g. `dev1`.
    pub cluster: String,
    /// Account identifier, for providers that support it.
    pub account: String,
    /// Region, for providers that support it.
    pub region: String,

    /// Ordered value-file or directory paths.
    pub vars_dirs: Vec<PathBuf>,
    /// Ordered manifest paths.
    pub manifests: Vec<PathBuf>,

    /// Max seconds to wait for the cluster to come online.
    #[serde(default = "default_timeout")]
    pub online_timeout: u64,
    /// Max seconds to wait for the cluster to become ready.
    #[serde(default = "default_timeout")]
    pub ready_timeout: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            dir: PathBuf::new(),
            provider: String::new(),
            provisioner: String::new(),
            profile: String::new(),
            cluster: String::new(),
            account: String::new(),
            region: String::new(),
            vars_dirs: Vec::new(),
            manifests: Vec::new(),
            online_timeout: DEFAULT_TIMEOUT_SECS,
            ready_timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// CLI-supplied overrides for a stack configuration.
///
/// Timeouts are optional so the CLI default can't silently clobber a value
/// configured in the stack file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub provider: String,
    pub provisioner: String,
    pub profile: String,
    pub cluster: String,
    pub account: String,
    pub region: String,
    pub vars_dirs: Vec<PathBuf>,
    pub manifests: Vec<PathBuf>,
    pub online_timeout: Option<u64>,
    pub ready_timeout: Option<u64>,
}

impl StackConfig {
    /// The cluster and profile must be known before a Provider or
    /// Provisioner is constructed.
    pub fn ensure_backend_ready(&self) -> Result<()> {
        if self.cluster.is_empty() {
            return Err(Error::Config {
                message: "no cluster configured".to_string(),
                hint: Some("Pass --cluster or set 'cluster' in the stack file".to_string()),
            });
        }
        if self.profile.is_empty() {
            return Err(Error::Config {
                message: "no profile configured".to_string(),
                hint: Some("Pass --profile or set 'profile' in the stack file".to_string()),
            });
        }
        Ok(())
    }

    /// Paths from a stack file are relative to the file itself.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || self.dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    pub fn online_timeout(&self) -> Duration {
        Duration::from_secs(self.online_timeout)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout)
    }
}

/// Runtime cluster status, owned by the orchestrator and updated from
/// explicit return values.
#[derive(Debug, Clone, Default)]
pub struct ClusterStatus {
    pub is_online: bool,
    pub is_ready: bool,
    pub started_this_run: bool,
    pub sleep_before_ready_check: Duration,
}

/// Load a named stack definition from a stack file.
pub fn load_stack_config(stack_name: &str, stack_file: &Path) -> Result<StackConfig> {
    let content = std::fs::read_to_string(stack_file).map_err(|e| Error::Config {
        message: format!("couldn't read stack file {}: {}", stack_file.display(), e),
        hint: None,
    })?;

    // Stack files map stack names to configs. Parse the whole file so an
    // unknown name can list what *is* defined.
    let mut stacks: std::collections::BTreeMap<String, StackConfig> =
        serde_yaml::from_str(&content).map_err(|e| Error::Config {
            message: format!("couldn't parse stack file {}: {}", stack_file.display(), e),
            hint: None,
        })?;

    let available: Vec<String> = stacks.keys().cloned().collect();

    let mut config = stacks.remove(stack_name).ok_or_else(|| {
        suggestions::stack_not_found(stack_name, &stack_file.display().to_string(), &available)
    })?;

    config.name = stack_name.to_string();
    config.dir = stack_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    Ok(config)
}

/// Resolve the authoritative stack configuration for one invocation.
///
/// - With neither a stack name nor a stack file, the configuration is
///   seeded entirely from CLI overrides.
/// - A stack name and a stack file are mutually required.
/// - Otherwise the named stack is loaded from the file and CLI overrides
///   are merged on top with override-wins-if-non-empty semantics. Lists
///   (vars_dirs, manifests) are replaced wholesale when supplied.
pub fn resolve(
    stack_name: Option<&str>,
    stack_file: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<StackConfig> {
    let mut config = match (stack_name, stack_file) {
        (None, None) => StackConfig::default(),
        (Some(_), None) => return Err(suggestions::stack_args_incomplete(true)),
        (None, Some(_)) => return Err(suggestions::stack_args_incomplete(false)),
        (Some(name), Some(file)) => load_stack_config(name, file)?,
    };

    merge_overrides(&mut config, overrides);

    debug!("Resolved stack config: {:?}", config);

    Ok(config)
}

/// CLI args override configured args. A zero/empty CLI field never clobbers
/// a configured one.
fn merge_overrides(config: &mut StackConfig, overrides: &CliOverrides) {
    fn override_string(target: &mut String, value: &str) {
        if !value.is_empty() {
            *target = value.to_string();
        }
    }

    override_string(&mut config.provider, &overrides.provider);
    override_string(&mut config.provisioner, &overrides.provisioner);
    override_string(&mut config.profile, &overrides.profile);
    override_string(&mut config.cluster, &overrides.cluster);
    override_string(&mut config.account, &overrides.account);
    override_string(&mut config.region, &overrides.region);

    // Lists are replaced wholesale, not appended. Callers wanting additive
    // behaviour pass the union explicitly.
    if !overrides.vars_dirs.is_empty() {
        config.vars_dirs = overrides.vars_dirs.clone();
    }
    if !overrides.manifests.is_empty() {
        config.manifests = overrides.manifests.clone();
    }

    if let Some(timeout) = overrides.online_timeout {
        config.online_timeout = timeout;
    }
    if let Some(timeout) = overrides.ready_timeout {
        config.ready_timeout = timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const STACK_FILE: &str = r#"
dev1:
  provider: aws
  provisioner: kops
  profile: dev
  cluster: dev1
  account: dev
  region: eu-west-1
  vars_dirs:
    - ./stacks
  manifests:
    - ./manifests/core.yaml
  online_timeout: 300

prod1:
  provider: aws
  provisioner: kops
  profile: prod
  cluster: prod1
"#;

    fn write_stack_file(temp_dir: &TempDir) -> PathBuf {
        let path = temp_dir.path().join("stacks.yaml");
        fs::write(&path, STACK_FILE).unwrap();
        path
    }

    #[test]
    fn test_resolve_without_stack_uses_overrides_only() {
        let overrides = CliOverrides {
            provider: "local".to_string(),
            provisioner: "minikube".to_string(),
            profile: "local".to_string(),
            cluster: "mini1".to_string(),
            ..Default::default()
        };

        let config = resolve(None, None, &overrides).unwrap();
        assert_eq!(config.provider, "local");
        assert_eq!(config.cluster, "mini1");
        assert_eq!(config.online_timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_resolve_name_without_file_fails() {
        let result = resolve(Some("dev1"), None, &CliOverrides::default());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("stack config file is required"));
    }

    #[test]
    fn test_resolve_file_without_name_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        let result = resolve(None, Some(&path), &CliOverrides::default());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("stack name is required"));
    }

    #[test]
    fn test_resolve_unknown_stack_suggests() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        let result = resolve(Some("dev9"), Some(&path), &CliOverrides::default());
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("stack 'dev9' not found"));
        assert!(message.contains("Did you mean 'dev1'?"));
    }

    #[test]
    fn test_resolve_loads_configured_stack() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        let config = resolve(Some("dev1"), Some(&path), &CliOverrides::default()).unwrap();
        assert_eq!(config.name, "dev1");
        assert_eq!(config.provider, "aws");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.online_timeout, 300);
        assert_eq!(config.ready_timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.dir, temp_dir.path());
    }

    #[test]
    fn test_non_empty_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        let overrides = CliOverrides {
            region: "us-east-1".to_string(),
            online_timeout: Some(120),
            ..Default::default()
        };

        let config = resolve(Some("dev1"), Some(&path), &overrides).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.online_timeout, 120);
    }

    #[test]
    fn test_empty_override_never_clobbers() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        // All overrides empty/None: every configured value must survive.
        let config = resolve(Some("dev1"), Some(&path), &CliOverrides::default()).unwrap();
        assert_eq!(config.provider, "aws");
        assert_eq!(config.profile, "dev");
        assert_eq!(config.cluster, "dev1");
        assert_eq!(config.account, "dev");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.vars_dirs, vec![PathBuf::from("./stacks")]);
        assert_eq!(config.online_timeout, 300);
    }

    #[test]
    fn test_manifest_lists_replaced_wholesale() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        let overrides = CliOverrides {
            manifests: vec![PathBuf::from("./other.yaml")],
            ..Default::default()
        };

        let config = resolve(Some("dev1"), Some(&path), &overrides).unwrap();
        assert_eq!(config.manifests, vec![PathBuf::from("./other.yaml")]);
    }

    #[test]
    fn test_ensure_backend_ready() {
        let mut config = StackConfig::default();
        assert!(config.ensure_backend_ready().is_err());

        config.cluster = "dev1".to_string();
        assert!(config.ensure_backend_ready().is_err());

        config.profile = "dev".to_string();
        assert!(config.ensure_backend_ready().is_ok());
    }

    #[test]
    fn test_resolve_path_relative_to_stack_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_stack_file(&temp_dir);

        let config = resolve(Some("dev1"), Some(&path), &CliOverrides::default()).unwrap();
        let resolved = config.resolve_path(Path::new("manifests/core.yaml"));
        assert_eq!(resolved, temp_dir.path().join("manifests/core.yaml"));

        let absolute = config.resolve_path(Path::new("/etc/manifest.yaml"));
        assert_eq!(absolute, PathBuf::from("/etc/manifest.yaml"));
    }
}

//! # Providers
//!
//! A provider supplies backend-specific configuration values and resolves
//! where value files live for a given profile/cluster pair. Two variants
//! exist: `local` (developer machines) and `aws`.
//!
//! Value files follow a fixed directory convention under each configured
//! base path:
//!
//! ```text
//! {base}/{provider}/profiles/{profile}/clusters/{cluster}
//! ```
//!
//! Every level of that chain must exist on disk. This is deliberate
//! fail-fast validation that the profile/cluster pair is materialized in
//! configuration before any expensive provisioning begins — a typo'd
//! cluster name dies here, not twenty minutes into a cluster build.

use std::path::PathBuf;

use log::debug;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::stack::StackConfig;
use crate::suggestions;
use crate::vars::{self, Values};

/// Provider names the factory accepts.
pub const KNOWN_PROVIDERS: &[&str] = &["local", "aws"];

const PROFILES_DIR: &str = "profiles";
const CLUSTERS_DIR: &str = "clusters";

/// Backend supplying environment-specific configuration values.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// The full merged values for the stack.
    fn vars(&self) -> &Values;

    /// The narrow, provider-specific subset of values that installers are
    /// allowed to consume. Never the full mapping.
    fn installer_vars(&self) -> Values;
}

/// Construct the provider named in the stack config and load its values.
///
/// The stack must already satisfy the non-empty cluster/profile invariant;
/// this is validated here so no backend is ever built from an incomplete
/// stack.
pub fn new_provider(stack: &StackConfig) -> Result<Box<dyn Provider>> {
    stack.ensure_backend_ready()?;

    match stack.provider.as_str() {
        "local" => Ok(Box::new(LocalProvider::new(stack)?)),
        "aws" => Ok(Box::new(AwsProvider::new(stack)?)),
        other => Err(suggestions::unknown_backend(
            "provider",
            other,
            KNOWN_PROVIDERS,
        )),
    }
}

/// Resolve the value directories for a stack under the fixed convention.
///
/// Returns the whole ancestor chain for each configured base path, most
/// general first, so files merge from shared to specific. Fails with
/// `MissingDirectory` naming the first absent directory.
pub fn value_dirs(stack: &StackConfig, provider_name: &str) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();

    for base in &stack.vars_dirs {
        let base = stack.resolve_path(base);

        if base.is_file() {
            // A plain value file is allowed alongside the convention.
            dirs.push(base);
            continue;
        }

        let chain = [
            base.clone(),
            base.join(provider_name),
            base.join(provider_name).join(PROFILES_DIR),
            base.join(provider_name).join(PROFILES_DIR).join(&stack.profile),
            base.join(provider_name)
                .join(PROFILES_DIR)
                .join(&stack.profile)
                .join(CLUSTERS_DIR),
            base.join(provider_name)
                .join(PROFILES_DIR)
                .join(&stack.profile)
                .join(CLUSTERS_DIR)
                .join(&stack.cluster),
        ];

        for dir in &chain {
            if !dir.is_dir() {
                return Err(Error::MissingDirectory { path: dir.clone() });
            }
        }

        dirs.extend(chain);
    }

    debug!("Value directories: {:?}", dirs);

    Ok(dirs)
}

/// Load and merge every value file under the stack's value directories.
fn load_vars(stack: &StackConfig, provider_name: &str) -> Result<Values> {
    let dirs = value_dirs(stack, provider_name)?;
    let files = vars::collect_values_files(&dirs)?;
    vars::merge_values_files(&files)
}

/// Look up a string at a nested path in values.
fn nested_string(values: &Values, path: &[&str]) -> Option<String> {
    let mut current = values.get(YamlValue::from(*path.first()?))?;
    for key in &path[1..] {
        current = current.get(*key)?;
    }
    current.as_str().map(|s| s.to_string())
}

/// The kube context for a stack: an explicit `kube_context` value wins,
/// then the provisioner's configured cluster name, then the stack cluster.
fn derive_kube_context(values: &Values, stack: &StackConfig) -> String {
    vars::get_string(values, "kube_context")
        .or_else(|| nested_string(values, &["provisioner", "params", "global", "name"]))
        .unwrap_or_else(|| stack.cluster.clone())
}

/// Provider for clusters on the local machine.
pub struct LocalProvider {
    values: Values,
    kube_context: String,
}

impl LocalProvider {
    pub fn new(stack: &StackConfig) -> Result<Self> {
        let values = load_vars(stack, "local")?;
        let kube_context = derive_kube_context(&values, stack);
        Ok(Self {
            values,
            kube_context,
        })
    }
}

impl Provider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn vars(&self) -> &Values {
        &self.values
    }

    fn installer_vars(&self) -> Values {
        let mut vars = Values::new();
        vars.insert(
            YamlValue::from("kube_context"),
            YamlValue::from(self.kube_context.clone()),
        );
        vars
    }
}

/// Provider for clusters in AWS accounts.
pub struct AwsProvider {
    values: Values,
    region: String,
    kube_context: String,
}

impl AwsProvider {
    pub fn new(stack: &StackConfig) -> Result<Self> {
        let mut values = load_vars(stack, "aws")?;

        // Stack-level identity is visible to value consumers too.
        if !stack.region.is_empty() {
            values.insert(
                YamlValue::from("region"),
                YamlValue::from(stack.region.clone()),
            );
        }
        if !stack.account.is_empty() {
            values.insert(
                YamlValue::from("account"),
                YamlValue::from(stack.account.clone()),
            );
        }

        let region = vars::get_string(&values, "region").unwrap_or_default();
        let kube_context = derive_kube_context(&values, stack);

        Ok(Self {
            values,
            region,
            kube_context,
        })
    }
}

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn vars(&self) -> &Values {
        &self.values
    }

    fn installer_vars(&self) -> Values {
        let mut vars = Values::new();
        vars.insert(
            YamlValue::from("region"),
            YamlValue::from(self.region.clone()),
        );
        vars.insert(
            YamlValue::from("kube_context"),
            YamlValue::from(self.kube_context.clone()),
        );
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn stack_with_base(base: &std::path::Path) -> StackConfig {
        StackConfig {
            provider: "local".to_string(),
            profile: "dev".to_string(),
            cluster: "dev1".to_string(),
            vars_dirs: vec![base.to_path_buf()],
            ..Default::default()
        }
    }

    fn materialize_convention(base: &std::path::Path, provider: &str) -> PathBuf {
        let cluster_dir = base
            .join(provider)
            .join("profiles")
            .join("dev")
            .join("clusters")
            .join("dev1");
        fs::create_dir_all(&cluster_dir).unwrap();
        cluster_dir
    }

    #[test]
    fn test_value_dirs_returns_ancestor_chain() {
        let temp_dir = TempDir::new().unwrap();
        materialize_convention(temp_dir.path(), "local");

        let stack = stack_with_base(temp_dir.path());
        let dirs = value_dirs(&stack, "local").unwrap();

        assert_eq!(dirs.len(), 6);
        assert_eq!(dirs[0], temp_dir.path());
        assert!(dirs[5].ends_with("local/profiles/dev/clusters/dev1"));
    }

    #[test]
    fn test_value_dirs_missing_profile_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        // Only the provider dir exists; the profile dir is missing.
        fs::create_dir_all(temp_dir.path().join("local")).unwrap();

        let stack = stack_with_base(temp_dir.path());
        let result = value_dirs(&stack, "local");

        match result {
            Err(Error::MissingDirectory { path }) => {
                assert!(path.ends_with("local/profiles"));
            }
            other => panic!("expected MissingDirectory, got {:?}", other),
        }
    }

    #[test]
    fn test_new_provider_unknown_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut stack = stack_with_base(temp_dir.path());
        stack.provider = "gcp".to_string();

        let result = new_provider(&stack);
        assert!(result.is_err());
        assert!(result
            .err()
            .unwrap()
            .to_string()
            .contains("provider 'gcp' doesn't exist"));
    }

    #[test]
    fn test_new_provider_requires_cluster_and_profile() {
        let stack = StackConfig {
            provider: "local".to_string(),
            ..Default::default()
        };
        assert!(new_provider(&stack).is_err());
    }

    #[test]
    fn test_vars_merge_from_general_to_specific() {
        let temp_dir = TempDir::new().unwrap();
        let cluster_dir = materialize_convention(temp_dir.path(), "local");

        fs::write(
            temp_dir.path().join("values.yaml"),
            "size: small\nshared: base\n",
        )
        .unwrap();
        fs::write(cluster_dir.join("values.yaml"), "size: large\n").unwrap();

        let stack = stack_with_base(temp_dir.path());
        let provider = new_provider(&stack).unwrap();

        assert_eq!(
            vars::get_string(provider.vars(), "size").as_deref(),
            Some("large")
        );
        assert_eq!(
            vars::get_string(provider.vars(), "shared").as_deref(),
            Some("base")
        );
    }

    #[test]
    fn test_installer_vars_is_narrow() {
        let temp_dir = TempDir::new().unwrap();
        let cluster_dir = materialize_convention(temp_dir.path(), "aws");
        fs::write(
            cluster_dir.join("values.yaml"),
            "secret_thing: hidden\nkube_context: dev1.example.com\n",
        )
        .unwrap();

        let mut stack = stack_with_base(temp_dir.path());
        stack.provider = "aws".to_string();
        stack.region = "eu-west-1".to_string();

        let provider = new_provider(&stack).unwrap();
        let installer_vars = provider.installer_vars();

        // Only the sanctioned keys leak to installers.
        assert_eq!(installer_vars.len(), 2);
        assert_eq!(
            vars::get_string(&installer_vars, "region").as_deref(),
            Some("eu-west-1")
        );
        assert_eq!(
            vars::get_string(&installer_vars, "kube_context").as_deref(),
            Some("dev1.example.com")
        );
        assert!(vars::get_string(&installer_vars, "secret_thing").is_none());
    }

    #[test]
    fn test_kube_context_falls_back_to_provisioner_name() {
        let temp_dir = TempDir::new().unwrap();
        let cluster_dir = materialize_convention(temp_dir.path(), "local");
        fs::write(
            cluster_dir.join("values.yaml"),
            "provisioner:\n  params:\n    global:\n      name: dev1.k8s.local\n",
        )
        .unwrap();

        let stack = stack_with_base(temp_dir.path());
        let provider = new_provider(&stack).unwrap();

        assert_eq!(
            vars::get_string(&provider.installer_vars(), "kube_context").as_deref(),
            Some("dev1.k8s.local")
        );
    }
}

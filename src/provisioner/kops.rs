//! The kops provisioner
//!
//! Drives the full managed-cluster lifecycle against the kops CLI:
//!
//! 1. Existence check (`kops get clusters`), bounded by a short deadline so
//!    bad credentials surface as a timeout instead of a hang.
//! 2. Create (`kops create cluster`) with flags derived from the create
//!    parameter group, only when the cluster config doesn't exist yet.
//! 3. Patch: download the materialized config (`kops get ... -o yaml`),
//!    deep-merge the desired spec onto it, stage the result to a temp file
//!    and `kops replace` it. The cluster spec and each named instance
//!    group are patched as isolated transactions — a failure patching one
//!    instance group doesn't roll back the others; every failure is
//!    collected and reported together.
//! 4. Converge (`kops update cluster --yes`, optionally followed by a
//!    rolling update) to make the live cluster match the patched config.
//!
//! The whole cycle is idempotent: re-running it with the same desired spec
//! downloads, merges and re-applies to the same result, which is what makes
//! re-invocation after a partial failure safe.

use std::io::Write;
use std::time::Duration;

use log::{debug, info};
use serde_yaml::{Mapping, Value as YamlValue};
use tempfile::NamedTempFile;

use crate::clustersot::{self, ClusterSot};
use crate::error::{Error, Result};
use crate::exec::{self, ToolCommand};
use crate::merge::merge_values;
use crate::provider::Provider;
use crate::stack::StackConfig;

use super::{flag_args, CreateOutcome, Provisioner, ProvisionerSpec};

const KOPS_PATH: &str = "kops";

/// Deadline for existence checks and config downloads.
const FETCH_DEADLINE: Duration = Duration::from_secs(5);

/// Settle delay after convergence before the first readiness poll: kops
/// replaces nodes asynchronously, so an immediate poll sees the old nodes.
const SETTLE_AFTER_START: Duration = Duration::from_secs(60);

const CREDENTIALS_HINT: &str = "Check your credentials and connectivity";

pub struct KopsProvisioner {
    cluster_sot: Box<dyn ClusterSot>,
}

impl KopsProvisioner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cluster_sot: clustersot::new_cluster_sot("kubectl")?,
        })
    }

    /// Whether a kops cluster config has already been created. This doesn't
    /// say anything about whether the cluster is actually running.
    fn cluster_config_exists(&self, spec: &ProvisionerSpec) -> Result<bool> {
        let name = spec.required_global("name")?;
        let state = spec.required_global("state")?;

        let command = ToolCommand::new(KOPS_PATH)
            .args(["get", "clusters", "--state", state.as_str(), name.as_str()]);

        let output = exec::run_with_deadline(
            &command,
            FETCH_DEADLINE,
            "retrieving the kops cluster config",
            Some(CREDENTIALS_HINT),
        )?;

        if output.success {
            return Ok(true);
        }

        // A silent non-zero exit means the config doesn't exist. Anything
        // the tool had to say about it is a real failure.
        if output.stdout.trim().is_empty() && output.stderr.trim().is_empty() {
            debug!("Cluster config doesn't exist");
            return Ok(false);
        }

        Err(Error::ExternalTool {
            command: command.display(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Download a resource's materialized config as YAML.
    fn download_config(&self, spec: &ProvisionerSpec, resource: &[&str]) -> Result<YamlValue> {
        let name = spec.required_global("name")?;
        let state = spec.required_global("state")?;

        let command = ToolCommand::new(KOPS_PATH)
            .args(["get"])
            .args(resource.iter().copied())
            .args(["--state", state.as_str(), "--name", name.as_str(), "-o", "yaml"]);

        let output = exec::run_with_deadline(
            &command,
            FETCH_DEADLINE,
            &format!("downloading the kops config for {}", resource.join(" ")),
            Some(CREDENTIALS_HINT),
        )?;

        if !output.success {
            return Err(Error::ExternalTool {
                command: command.display(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let config: YamlValue = serde_yaml::from_str(&output.stdout)?;
        debug!("Downloaded config for {}: {:?}", resource.join(" "), config);

        Ok(config)
    }

    /// Merge the desired spec onto a downloaded config, stage the result to
    /// a temp file and `kops replace` it. The temp file is removed on every
    /// exit path when it drops.
    fn patch_resource(
        &self,
        spec: &ProvisionerSpec,
        resource: &[&str],
        desired: &Mapping,
        dry_run: bool,
    ) -> Result<()> {
        if desired.is_empty() {
            debug!("No desired spec for {}, skipping patch", resource.join(" "));
            return Ok(());
        }

        let mut config = self.download_config(spec, resource)?;

        let mut wrapper = Mapping::new();
        wrapper.insert(
            YamlValue::from("spec"),
            YamlValue::Mapping(desired.clone()),
        );
        merge_values(&mut config, &YamlValue::Mapping(wrapper));

        debug!("Merged config for {}: {:?}", resource.join(" "), config);

        let name = spec.required_global("name")?;
        let state = spec.required_global("state")?;

        // kops can't read a spec from stdin, so stage it to a file
        let mut staged = NamedTempFile::new()?;
        staged.write_all(serde_yaml::to_string(&config)?.as_bytes())?;
        staged.flush()?;

        let command = ToolCommand::new(KOPS_PATH)
            .args(["replace", "--state", state.as_str(), "--name", name.as_str(), "-f"])
            .arg(staged.path().display().to_string());

        if dry_run {
            info!("Dry run. Would execute: {}", command.display());
        } else {
            info!("Patching kops config for {}", resource.join(" "));
            exec::run_captured(&command)?;
        }

        Ok(())
    }

    /// Patch the cluster spec, then each named instance group. Instance
    /// group patches are isolated transactions: all of them are attempted
    /// and every failure is reported.
    fn patch_specs(&self, spec: &ProvisionerSpec, dry_run: bool) -> Result<()> {
        self.patch_resource(spec, &["cluster"], &spec.specs.cluster, dry_run)?;

        let mut failures = Vec::new();

        for (group_name, desired) in &spec.specs.instance_groups {
            let group_name = match group_name.as_str() {
                Some(n) => n,
                None => continue,
            };
            let desired = match desired.as_mapping() {
                Some(m) => m,
                None => {
                    failures.push(format!(
                        "instance group '{}': desired spec must be a mapping",
                        group_name
                    ));
                    continue;
                }
            };

            if let Err(e) =
                self.patch_resource(spec, &["instancegroup", group_name], desired, dry_run)
            {
                failures.push(format!("instance group '{}': {}", group_name, e));
            }
        }

        if !failures.is_empty() {
            return Err(Error::Convergence { failures });
        }

        Ok(())
    }

    /// Make the live cluster match the patched config.
    fn apply(&self, spec: &ProvisionerSpec, dry_run: bool) -> Result<()> {
        let name = spec.required_global("name")?;
        let state = spec.required_global("state")?;

        let command = ToolCommand::new(KOPS_PATH).args([
            "update",
            "cluster",
            "--state",
            state.as_str(),
            "--name",
            name.as_str(),
            "--yes",
        ]);

        if dry_run {
            info!("Dry run. Would execute: {}", command.display());
        } else {
            info!("Applying kops cluster config...");
            exec::run_captured(&command)?;
        }

        let rolling = spec
            .params
            .update
            .get(YamlValue::from("rolling_update"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if rolling {
            let command = ToolCommand::new(KOPS_PATH).args([
                "rolling-update",
                "cluster",
                "--state",
                state.as_str(),
                "--name",
                name.as_str(),
                "--yes",
            ]);

            if dry_run {
                info!("Dry run. Would execute: {}", command.display());
            } else {
                info!("Rolling update of kops cluster...");
                exec::run_captured(&command)?;
            }
        }

        Ok(())
    }
}

impl Provisioner for KopsProvisioner {
    fn create(
        &self,
        _stack: &StackConfig,
        provider: &dyn Provider,
        dry_run: bool,
    ) -> Result<CreateOutcome> {
        let spec = ProvisionerSpec::from_values(provider.vars())?;

        if !self.cluster_config_exists(&spec)? {
            let args = flag_args(&spec.stage_params(&spec.params.create));
            let command = ToolCommand::new(KOPS_PATH)
                .args(["create", "cluster"])
                .args(args);

            if dry_run {
                info!("Dry run. Would execute: {}", command.display());
            } else {
                info!("Creating kops cluster config... Executing: {}", command.display());
                let output = exec::run_captured(&command)?;
                debug!("kops returned:\n{}", output.stdout);
                info!("kops cluster config created");
            }
        }

        self.patch_specs(&spec, dry_run)?;
        self.apply(&spec, dry_run)?;

        if dry_run {
            return Ok(CreateOutcome::default());
        }

        Ok(CreateOutcome {
            started_this_run: true,
            settle_before_ready_check: SETTLE_AFTER_START,
        })
    }

    fn update(
        &self,
        _stack: &StackConfig,
        provider: &dyn Provider,
        dry_run: bool,
    ) -> Result<CreateOutcome> {
        let spec = ProvisionerSpec::from_values(provider.vars())?;

        if !self.cluster_config_exists(&spec)? {
            debug!("No kops cluster config to update");
            return Ok(CreateOutcome::default());
        }

        self.patch_specs(&spec, dry_run)?;
        self.apply(&spec, dry_run)?;

        if dry_run {
            return Ok(CreateOutcome::default());
        }

        Ok(CreateOutcome {
            started_this_run: true,
            settle_before_ready_check: SETTLE_AFTER_START,
        })
    }

    fn is_already_online(&self, stack: &StackConfig, provider: &dyn Provider) -> Result<bool> {
        let spec = ProvisionerSpec::from_values(provider.vars())?;

        if !self.cluster_config_exists(&spec)? {
            return Ok(false);
        }

        self.cluster_sot.is_online(stack, provider.vars())
    }

    fn cluster_sot(&self) -> &dyn ClusterSot {
        self.cluster_sot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_values;

    // The convergence merge itself: the downloaded config keeps everything
    // the desired spec doesn't mention, and gains the sub-trees it adds.
    const SAMPLE_KOPS_CONFIG: &str = "
apiVersion: kops/v1alpha2
kind: Cluster
metadata:
  creationTimestamp: 2018-09-05T09:10:52Z
  name: dev1.eu-west-1.example.com
spec:
  api:
    loadBalancer:
      type: Public
  authorization:
    rbac: {}
  cloudProvider: aws
  etcdClusters:
  - etcdMembers:
    - instanceGroup: master-eu-west-1a
      name: a
    name: main
";

    const SPEC_TO_MERGE: &str = "
spec:
  docker:
    logOpt:
    - max-size: 10m
    logDriver: json-file
  api:
    loadBalancer:
      type: Public
";

    #[test]
    fn test_merge_kops_config() {
        let mut config: YamlValue = serde_yaml::from_str(SAMPLE_KOPS_CONFIG).unwrap();
        let desired: YamlValue = serde_yaml::from_str(SPEC_TO_MERGE).unwrap();

        merge_values(&mut config, &desired);

        let spec = config.get("spec").unwrap();
        assert_eq!(
            spec.get("cloudProvider").and_then(|v| v.as_str()),
            Some("aws")
        );
        assert_eq!(
            spec.get("docker")
                .and_then(|d| d.get("logDriver"))
                .and_then(|v| v.as_str()),
            Some("json-file")
        );
        assert!(spec
            .get("docker")
            .and_then(|d| d.get("logOpt"))
            .and_then(|v| v.as_sequence())
            .is_some());
        assert!(spec.get("etcdClusters").is_some());
        assert_eq!(
            config
                .get("metadata")
                .and_then(|m| m.get("name"))
                .and_then(|v| v.as_str()),
            Some("dev1.eu-west-1.example.com")
        );

        // Merging the same desired spec again changes nothing.
        let before = config.clone();
        merge_values(&mut config, &desired);
        assert_eq!(config, before);
    }

    #[test]
    fn test_create_flags_from_params() {
        let values: crate::vars::Values = serde_yaml::from_str(
            r#"
provisioner:
  params:
    global:
      name: dev1.example.com
      state: s3://state
    create:
      zones: eu-west-1a
      node_count: 3
"#,
        )
        .unwrap();

        let spec = ProvisionerSpec::from_values(&values).unwrap();
        let args = flag_args(&spec.stage_params(&spec.params.create));

        assert!(args.contains(&"--name".to_string()));
        assert!(args.contains(&"--node-count".to_string()));
        assert!(args.contains(&"--zones".to_string()));
        assert!(!args.iter().any(|a| a.contains("specs")));
    }

    #[test]
    fn test_cluster_config_exists_requires_name_and_state() {
        let provisioner = KopsProvisioner::new().unwrap();
        let spec = ProvisionerSpec::default();

        let result = provisioner.cluster_config_exists(&spec);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("missing 'name'"));
    }
}

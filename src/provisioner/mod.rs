//! # Provisioners
//!
//! A provisioner creates and converges a cluster through an external
//! cluster-management tool. Two variants exist: `kops` drives the full
//! managed-cluster lifecycle, `minikube` covers local clusters (which are
//! started out of band, so most of its operations are no-ops).
//!
//! The desired state a provisioner works from is the `provisioner` section
//! of the stack's merged values:
//!
//! ```yaml
//! provisioner:
//!   params:
//!     global:
//!       name: dev1.eu-west-1.example.com
//!       state: s3://example-kops-state
//!     create:
//!       zones: eu-west-1a
//!       node_count: 3
//!     update:
//!       rolling_update: true
//!   specs:
//!     cluster:
//!       docker:
//!         logDriver: json-file
//!     instanceGroups:
//!       nodes:
//!         maxSize: 5
//! ```
//!
//! `params` groups become CLI flags (`snake_case` keys become
//! `--kebab-case` flags); `specs` sub-trees are deep-merged onto the
//! tool's own materialized configuration during convergence. The two are
//! structurally separate, so flag derivation never sees the specs tree.

mod kops;
mod minikube;

pub use kops::KopsProvisioner;
pub use minikube::MinikubeProvisioner;

use std::time::Duration;

use serde::Deserialize;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::clustersot::ClusterSot;
use crate::error::{Error, Result};
use crate::merge::merge_mappings;
use crate::provider::Provider;
use crate::stack::StackConfig;
use crate::suggestions;
use crate::vars::{scalar_to_string, Values};

/// Provisioner names the factory accepts.
pub const KNOWN_PROVISIONERS: &[&str] = &["kops", "minikube"];

/// Key in Values that holds the provisioner's desired state.
pub const PROVISIONER_KEY: &str = "provisioner";

/// What a successful create/update changed, reported back to the
/// orchestrator instead of mutated into shared state.
#[derive(Debug, Clone, Default)]
pub struct CreateOutcome {
    /// True when this run actually started or converged the cluster.
    pub started_this_run: bool,
    /// Settle delay before the first readiness poll. Convergence can
    /// trigger asynchronous node replacement; polling immediately reports
    /// a misleading "ready".
    pub settle_before_ready_check: Duration,
}

/// Component that creates/converges a cluster via an external tool.
pub trait Provisioner {
    /// Create the cluster if its config doesn't exist yet, then converge
    /// it. A dry run logs the equivalent commands and mutates nothing.
    fn create(
        &self,
        stack: &StackConfig,
        provider: &dyn Provider,
        dry_run: bool,
    ) -> Result<CreateOutcome>;

    /// Converge an existing cluster (patch specs, re-apply). A no-op when
    /// the cluster config doesn't exist.
    fn update(
        &self,
        stack: &StackConfig,
        provider: &dyn Provider,
        dry_run: bool,
    ) -> Result<CreateOutcome>;

    /// Whether the cluster is already running.
    fn is_already_online(&self, stack: &StackConfig, provider: &dyn Provider) -> Result<bool>;

    /// The source of truth this provisioner polls for cluster state.
    fn cluster_sot(&self) -> &dyn ClusterSot;
}

/// Construct the provisioner named in the stack config.
pub fn new_provisioner(name: &str) -> Result<Box<dyn Provisioner>> {
    match name {
        "kops" => Ok(Box::new(KopsProvisioner::new()?)),
        "minikube" => Ok(Box::new(MinikubeProvisioner::new()?)),
        other => Err(suggestions::unknown_backend(
            "provisioner",
            other,
            KNOWN_PROVISIONERS,
        )),
    }
}

/// Parameter groups for the lifecycle stages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParamGroups {
    pub global: Mapping,
    pub create: Mapping,
    pub update: Mapping,
}

/// The deep-mergeable spec sub-trees, keyed by resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourceSpecs {
    pub cluster: Mapping,
    #[serde(rename = "instanceGroups")]
    pub instance_groups: Mapping,
}

/// The provisioner's desired state, parsed from the `provisioner` key of
/// the stack values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvisionerSpec {
    pub params: ParamGroups,
    pub specs: ResourceSpecs,
}

impl ProvisionerSpec {
    pub fn from_values(values: &Values) -> Result<Self> {
        match values.get(YamlValue::from(PROVISIONER_KEY)) {
            Some(section) => {
                serde_yaml::from_value(section.clone()).map_err(|e| Error::Config {
                    message: format!("couldn't parse the '{}' values: {}", PROVISIONER_KEY, e),
                    hint: None,
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// The global params with a lifecycle stage's params merged over them.
    pub fn stage_params(&self, stage: &Mapping) -> Mapping {
        let mut merged = self.params.global.clone();
        merge_mappings(&mut merged, stage);
        merged
    }

    /// A required entry from the global params.
    pub fn required_global(&self, key: &str) -> Result<String> {
        self.params
            .global
            .get(YamlValue::from(key))
            .map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("provisioner params are missing '{}'", key),
                hint: Some(format!(
                    "Set 'provisioner.params.global.{}' in your values",
                    key
                )),
            })
    }
}

/// Translate a parameter group into CLI flags: each `snake_case` key
/// becomes a `--kebab-case` flag followed by its rendered value.
pub fn flag_args(params: &Mapping) -> Vec<String> {
    let mut args = Vec::new();

    for (key, value) in params {
        let key = match key.as_str() {
            Some(k) => k.replace('_', "-"),
            None => continue,
        };
        args.push(format!("--{}", key));
        args.push(scalar_to_string(value));
    }

    args
}

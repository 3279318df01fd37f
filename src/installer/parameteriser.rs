//! Capability detection for kapps
//!
//! A kapp declares what it is by the files it carries: a `Chart.yaml` means
//! it installs a helm chart, a `terraform/` directory means it provisions
//! infrastructure. Each detected capability yields a parameteriser that
//! contributes environment variables and at most one extra build-tool
//! argument.
//!
//! Detection runs in a fixed registry order and env maps are ordered, so
//! the composed environment for a given kapp is deterministic — it never
//! depends on directory iteration order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;
use crate::manifest::Kapp;
use crate::vars::{self, Values};

use super::find_files_by_pattern;

/// Contributes env vars and CLI arguments for installing a kapp.
pub trait Parameteriser {
    fn name(&self) -> &'static str;

    /// Additional environment variables for the build tool.
    fn env_vars(&self, installer_vars: &Values) -> Result<BTreeMap<String, String>>;

    /// An additional build-tool argument, computed against the pattern
    /// matches that are valid for this stack (cluster, profile, provider
    /// names). Used to select environment-specific files by naming
    /// convention.
    fn cli_arg(&self, valid_patterns: &[String]) -> Result<Option<String>>;
}

/// Detect a kapp's capabilities from its interface markers, in registry
/// order: helm first, then terraform.
pub fn identify_interfaces(kapp: &Kapp, kapp_root: &Path) -> Result<Vec<Box<dyn Parameteriser>>> {
    let mut parameterisers: Vec<Box<dyn Parameteriser>> = Vec::new();

    if !find_files_by_pattern(kapp_root, "Chart.yaml")?.is_empty() {
        debug!("Kapp '{}' installs a helm chart", kapp.id);
        parameterisers.push(Box::new(HelmParameteriser {
            kapp_id: kapp.id.clone(),
        }));
    }

    let terraform_dir = kapp_root.join("terraform");
    if terraform_dir.is_dir() {
        debug!("Kapp '{}' carries terraform config", kapp.id);
        parameterisers.push(Box::new(TerraformParameteriser { dir: terraform_dir }));
    }

    Ok(parameterisers)
}

/// Helm charts need a target namespace, a release name and the kube
/// context to install into.
pub struct HelmParameteriser {
    kapp_id: String,
}

impl Parameteriser for HelmParameteriser {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn env_vars(&self, installer_vars: &Values) -> Result<BTreeMap<String, String>> {
        let mut env = BTreeMap::new();
        env.insert("NAMESPACE".to_string(), self.kapp_id.clone());
        env.insert("RELEASE".to_string(), self.kapp_id.clone());
        if let Some(context) = vars::get_string(installer_vars, "kube_context") {
            env.insert("KUBE_CONTEXT".to_string(), context);
        }
        Ok(env)
    }

    fn cli_arg(&self, _valid_patterns: &[String]) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Terraform kapps pick up an environment-specific tfvars file named after
/// the cluster, profile or provider.
pub struct TerraformParameteriser {
    dir: PathBuf,
}

impl Parameteriser for TerraformParameteriser {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn env_vars(&self, _installer_vars: &Values) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }

    fn cli_arg(&self, valid_patterns: &[String]) -> Result<Option<String>> {
        // First match wins; patterns arrive most-specific first.
        for pattern in valid_patterns {
            if pattern.is_empty() {
                continue;
            }
            let candidate = self.dir.join(format!("{}.tfvars", pattern));
            if candidate.is_file() {
                return Ok(Some(format!("TFVARS_FILE={}", candidate.display())));
            }
        }

        Ok(None)
    }
}

//! Installing kapps with make
//!
//! Every kapp ships a Makefile exposing `install` and `destroy` targets.
//! The installer finds it, composes the environment contract the targets
//! expect and runs the chosen target from the Makefile's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::exec::{self, ToolCommand};
use crate::manifest::Kapp;
use crate::provider::Provider;
use crate::stack::StackConfig;
use crate::vars::{scalar_to_string, Values};

use super::parameteriser::{self, Parameteriser};
use super::{find_files_by_pattern, Installer};

const MAKE_PATH: &str = "make";
const BUILD_FILE: &str = "Makefile";

const TARGET_INSTALL: &str = "install";
const TARGET_DESTROY: &str = "destroy";

/// Installs kapps by running targets in their Makefiles.
pub struct MakeInstaller;

impl MakeInstaller {
    fn run(
        &self,
        target: &str,
        kapp: &Kapp,
        kapp_root: &Path,
        stack: &StackConfig,
        provider: &dyn Provider,
        approved: bool,
        dry_run: bool,
    ) -> Result<()> {
        let build_file = locate_build_file(kapp, kapp_root)?;
        let build_dir = build_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| kapp_root.to_path_buf());

        let kapp_root = kapp_root.canonicalize()?;
        let installer_vars = provider.installer_vars();
        let parameterisers = parameteriser::identify_interfaces(kapp, &kapp_root)?;

        let env = compose_env(
            stack,
            &kapp_root,
            approved,
            &installer_vars,
            &parameterisers,
        )?;

        // Patterns used to pick environment-specific files, most specific
        // first.
        let valid_patterns = vec![
            stack.cluster.clone(),
            stack.profile.clone(),
            stack.provider.clone(),
        ];

        let mut args = vec![target.to_string()];
        for parameteriser in &parameterisers {
            if let Some(arg) = parameteriser.cli_arg(&valid_patterns)? {
                args.push(arg);
            }
        }

        let command = ToolCommand::new(MAKE_PATH)
            .args(args)
            .envs(&env)
            .current_dir(&build_dir);

        if dry_run {
            info!(
                "Dry run. Would {} kapp '{}' in '{}' with: {}",
                target,
                kapp.id,
                build_dir.display(),
                command.display()
            );
            return Ok(());
        }

        info!("{}ing kapp '{}'...", capitalize(target), kapp.id);
        debug!(
            "Running {} for kapp '{}' in '{}' with env {:?}",
            target,
            kapp.id,
            build_dir.display(),
            env
        );

        exec::run_captured(&command).map_err(|e| match e {
            Error::ExternalTool {
                command,
                stdout,
                stderr,
            } => Error::ExternalTool {
                command: format!("{} (kapp '{}')", command, kapp.id),
                stdout,
                stderr,
            },
            other => other,
        })?;

        info!("Kapp '{}' successfully {}ed", kapp.id, target);

        Ok(())
    }
}

impl Installer for MakeInstaller {
    fn install(
        &self,
        kapp: &Kapp,
        kapp_root: &Path,
        stack: &StackConfig,
        provider: &dyn Provider,
        approved: bool,
        dry_run: bool,
    ) -> Result<()> {
        self.run(
            TARGET_INSTALL,
            kapp,
            kapp_root,
            stack,
            provider,
            approved,
            dry_run,
        )
    }

    fn destroy(
        &self,
        kapp: &Kapp,
        kapp_root: &Path,
        stack: &StackConfig,
        provider: &dyn Provider,
        approved: bool,
        dry_run: bool,
    ) -> Result<()> {
        self.run(
            TARGET_DESTROY,
            kapp,
            kapp_root,
            stack,
            provider,
            approved,
            dry_run,
        )
    }
}

/// Locate the kapp's build file. Exactly one must apply: zero is fatal,
/// several require an explicit `build_file` selection in the manifest.
fn locate_build_file(kapp: &Kapp, kapp_root: &Path) -> Result<PathBuf> {
    let candidates = find_files_by_pattern(kapp_root, BUILD_FILE)?;

    match candidates.len() {
        0 => Err(Error::NotFound {
            message: format!(
                "no {} found for kapp '{}' in '{}'",
                BUILD_FILE,
                kapp.id,
                kapp_root.display()
            ),
        }),
        1 => Ok(candidates.into_iter().next().unwrap_or_default()),
        _ => match &kapp.build_file {
            Some(selection) => candidates
                .iter()
                .find(|c| c.ends_with(selection))
                .cloned()
                .ok_or_else(|| Error::Config {
                    message: format!(
                        "kapp '{}': build_file '{}' doesn't match any of the {} found",
                        kapp.id,
                        selection,
                        BUILD_FILE
                    ),
                    hint: Some(format!(
                        "Found: {}",
                        candidates
                            .iter()
                            .map(|c| c.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                }),
            None => Err(Error::Config {
                message: format!(
                    "multiple {}s found for kapp '{}'",
                    BUILD_FILE, kapp.id
                ),
                hint: Some(format!(
                    "Set 'build_file' on the kapp's manifest entry to pick one of: {}",
                    candidates
                        .iter()
                        .map(|c| c.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            }),
        },
    }
}

/// Compose the environment for a build-tool invocation.
///
/// Layers, later entries overriding earlier keys: the five fixed keys, the
/// provider's installer vars (upper-cased), then each parameteriser's
/// contribution in detection order.
pub fn compose_env(
    stack: &StackConfig,
    kapp_root: &Path,
    approved: bool,
    installer_vars: &Values,
    parameterisers: &[Box<dyn Parameteriser>],
) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();

    env.insert("KAPP_ROOT".to_string(), kapp_root.display().to_string());
    env.insert("APPROVED".to_string(), approved.to_string());
    env.insert("CLUSTER".to_string(), stack.cluster.clone());
    env.insert("PROFILE".to_string(), stack.profile.clone());
    env.insert("PROVIDER".to_string(), stack.provider.clone());

    for (key, value) in installer_vars {
        if let Some(key) = key.as_str() {
            env.insert(key.to_uppercase(), scalar_to_string(value));
        }
    }

    for parameteriser in parameterisers {
        for (key, value) in parameteriser.env_vars(installer_vars)? {
            env.insert(key, value);
        }
    }

    Ok(env)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

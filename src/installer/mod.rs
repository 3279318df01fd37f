//! # Installers
//!
//! An installer takes an acquired kapp and makes it present in (or absent
//! from) a cluster by invoking an external build tool. The only shipped
//! variant drives `make`: every kapp carries a Makefile with `install` and
//! `destroy` targets, and stackform's job is to compose the environment and
//! arguments those targets expect.
//!
//! The environment is derived in three layers:
//!
//! 1. fixed keys (`KAPP_ROOT`, `APPROVED`, `CLUSTER`, `PROFILE`,
//!    `PROVIDER`);
//! 2. the provider's installer vars, upper-cased (e.g. `REGION`,
//!    `KUBE_CONTEXT`);
//! 3. whatever the kapp's detected capabilities contribute (see
//!    [`parameteriser`]).
//!
//! Composition is deterministic: the env map is ordered and capabilities
//! are detected in a fixed registry order, so the same kapp always gets
//! the same environment.

pub mod make;
pub mod parameteriser;

pub use make::MakeInstaller;

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::manifest::Kapp;
use crate::provider::Provider;
use crate::stack::StackConfig;
use crate::suggestions;

/// Installer names the factory accepts.
pub const KNOWN_INSTALLERS: &[&str] = &["make"];

/// Installs and destroys kapps via an external build tool.
pub trait Installer {
    fn install(
        &self,
        kapp: &Kapp,
        kapp_root: &Path,
        stack: &StackConfig,
        provider: &dyn Provider,
        approved: bool,
        dry_run: bool,
    ) -> Result<()>;

    fn destroy(
        &self,
        kapp: &Kapp,
        kapp_root: &Path,
        stack: &StackConfig,
        provider: &dyn Provider,
        approved: bool,
        dry_run: bool,
    ) -> Result<()>;
}

/// Construct the installer with the given name.
pub fn new_installer(name: &str) -> Result<Box<dyn Installer>> {
    match name {
        "make" => Ok(Box::new(MakeInstaller)),
        other => Err(suggestions::unknown_backend(
            "installer",
            other,
            KNOWN_INSTALLERS,
        )),
    }
}

/// Find files under `root` whose name matches the given glob pattern,
/// skipping hidden directories. Results are sorted for determinism.
pub fn find_files_by_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(pattern).map_err(|e| Error::Config {
        message: format!("invalid file pattern '{}': {}", pattern, e),
        hint: None,
    })?;

    let mut matches: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        // Skip hidden directories (.git and friends), but never the root
        // itself, whose name we don't control.
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with('.') && name.len() > 1)
                    .unwrap_or(false)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| pattern.matches(name))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    matches.sort();

    Ok(matches)
}

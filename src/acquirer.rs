//! # Acquirers
//!
//! An acquirer resolves a kapp [`Source`] into a local directory. The only
//! shipped variant fetches from git, using the system git binary so SSH
//! keys, credential helpers and personal access tokens all work without any
//! configuration on our side.
//!
//! Acquirers have a stable [`id`](Acquirer::id) derived from the source's
//! identity `(uri, branch, path)`, which doubles as the cache directory
//! name. Fetching into a destination that already holds a checkout is a
//! no-op — the orchestrator may acquire the same source several times
//! across retries, and repeated fetches must be idempotent, not merely
//! cheap.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::exec::{self, ToolCommand};
use crate::manifest::Source;
use crate::suggestions;

/// Acquirer names the factory accepts.
pub const KNOWN_ACQUIRERS: &[&str] = &["git"];

/// Strategy for fetching a kapp source into a local directory.
pub trait Acquirer {
    /// Stable identity used for deduplication and cache paths.
    fn id(&self) -> String;

    /// Fetch the source into `dest`. Idempotent for an already-populated
    /// destination.
    fn fetch(&self, dest: &Path) -> Result<()>;
}

/// Construct the acquirer for a source descriptor.
///
/// Dispatches on the source's explicit `acquirer` tag when present,
/// otherwise infers one from the URI. An unknown tag is fatal.
pub fn new_acquirer(source: &Source) -> Result<Box<dyn Acquirer>> {
    let kind = match &source.acquirer {
        Some(tag) => tag.clone(),
        None => infer_acquirer(&source.uri)?,
    };

    match kind.as_str() {
        "git" => Ok(Box::new(GitAcquirer::new(source))),
        other => Err(suggestions::unknown_backend(
            "acquirer",
            other,
            KNOWN_ACQUIRERS,
        )),
    }
}

/// Infer the acquirer type from a source URI.
fn infer_acquirer(uri: &str) -> Result<String> {
    if uri.ends_with(".git") || uri.starts_with("git@") {
        return Ok("git".to_string());
    }

    // http(s) remotes don't always carry a .git suffix; treat any URL with
    // a recognised scheme as git rather than guessing further.
    if let Ok(url) = Url::parse(uri) {
        if matches!(url.scheme(), "http" | "https" | "ssh" | "git") {
            return Ok("git".to_string());
        }
    }

    Err(Error::Config {
        message: format!("couldn't infer an acquirer for source uri '{}'", uri),
        hint: Some("Set 'acquirer: git' on the source explicitly".to_string()),
    })
}

/// Fetches kapp sources with the system git client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitAcquirer {
    name: String,
    uri: String,
    branch: String,
    path: String,
}

impl GitAcquirer {
    pub fn new(source: &Source) -> Self {
        Self {
            name: source.display_name(),
            uri: source.uri.clone(),
            branch: source.branch.clone(),
            path: source.path.clone(),
        }
    }

    fn clone_shallow(&self, dest: &Path) -> Result<()> {
        // git won't clone into an existing non-empty dir
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let command = ToolCommand::new("git")
            .args([
                "clone",
                "--depth=1",
                "--branch",
                self.branch.as_str(),
                self.uri.as_str(),
            ])
            .arg(dest.display().to_string());

        info!("Fetching {}@{}", self.uri, self.branch);

        let output = exec::run_tolerant(&command)?;
        if !output.success {
            let hint = if output.stderr.contains("Authentication failed")
                || output.stderr.contains("Permission denied")
                || output.stderr.contains("Could not read from remote repository")
            {
                Some(
                    "Make sure you have access to the repository: an SSH key \
                     added to ssh-agent, git credentials configured, or a \
                     personal access token set up"
                        .to_string(),
                )
            } else {
                None
            };

            return Err(Error::Config {
                message: format!(
                    "couldn't clone {}@{}: {}",
                    self.uri,
                    self.branch,
                    output.stderr.trim()
                ),
                hint,
            });
        }

        Ok(())
    }
}

impl Acquirer for GitAcquirer {
    fn id(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.uri.hash(&mut hasher);
        self.path.hash(&mut hasher);
        let digest = format!("{:x}", hasher.finish());

        // Sanitize the branch for filesystem use (replace / with -)
        let safe_branch = self.branch.replace('/', "-");

        format!("{}-{}-{}", self.name, safe_branch, digest)
    }

    fn fetch(&self, dest: &Path) -> Result<()> {
        if dest.join(".git").exists() {
            debug!(
                "Source {} already fetched to {}, skipping",
                self.id(),
                dest.display()
            );
            return Ok(());
        }

        self.clone_shallow(dest)
    }
}

/// The cache directory for an acquirer under the given cache root.
pub fn cache_dir(cache_root: &Path, acquirer: &dyn Acquirer) -> PathBuf {
    cache_root.join(acquirer.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(uri: &str, branch: &str, path: &str) -> Source {
        Source {
            acquirer: None,
            uri: uri.to_string(),
            branch: branch.to_string(),
            path: path.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_new_acquirer_infers_git_from_suffix() {
        let acquirer = new_acquirer(&source("git@github.com:e/r.git", "master", "p")).unwrap();
        assert!(acquirer.id().contains("master"));
    }

    #[test]
    fn test_new_acquirer_infers_git_from_https() {
        let result = new_acquirer(&source("https://github.com/e/r", "main", ""));
        assert!(result.is_ok());
    }

    #[test]
    fn test_new_acquirer_explicit_unknown_tag_fails() {
        let mut src = source("git@github.com:e/r.git", "master", "p");
        src.acquirer = Some("gti".to_string());

        let result = new_acquirer(&src);
        assert!(result.is_err());
        let message = result.err().unwrap().to_string();
        assert!(message.contains("acquirer 'gti' doesn't exist"));
        assert!(message.contains("Did you mean 'git'?"));
    }

    #[test]
    fn test_new_acquirer_uninferrable_uri_fails() {
        let result = new_acquirer(&source("not a uri at all", "master", ""));
        assert!(result.is_err());
    }

    #[test]
    fn test_id_is_stable_and_keyed_on_identity() {
        let a = GitAcquirer::new(&source("git@github.com:e/r.git", "master", "wordpress"));
        let b = GitAcquirer::new(&source("git@github.com:e/r.git", "master", "wordpress"));
        let c = GitAcquirer::new(&source("git@github.com:e/other.git", "master", "wordpress"));

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_id_sanitizes_branch_slashes() {
        let acquirer = GitAcquirer::new(&source(
            "git@github.com:e/r.git",
            "feature/new-thing",
            "wordpress",
        ));
        assert!(acquirer.id().contains("feature-new-thing"));
        assert!(!acquirer.id().contains('/'));
    }

    #[test]
    fn test_fetch_is_idempotent_for_existing_checkout() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("checkout");

        // Simulate an existing checkout; a second fetch must not touch git.
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        std::fs::write(dest.join("marker.txt"), "untouched").unwrap();

        let acquirer = GitAcquirer::new(&source("git@github.com:e/r.git", "master", "p"));
        acquirer.fetch(&dest).unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("marker.txt")).unwrap(),
            "untouched"
        );
    }

    #[test]
    fn test_cache_dir_joins_id() {
        let acquirer = GitAcquirer::new(&source("git@github.com:e/r.git", "master", "wordpress"));
        let dir = cache_dir(Path::new("/cache"), &acquirer);
        assert!(dir.starts_with("/cache"));
        assert!(dir.to_string_lossy().contains("wordpress"));
    }
}

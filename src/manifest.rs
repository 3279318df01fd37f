//! # Manifest Parsing
//!
//! Manifests declare which kapps should be present in or absent from a
//! cluster:
//!
//! ```yaml
//! present:
//!   wordpress:
//!     sources:
//!       - uri: git@github.com:example/kapps.git
//!         branch: wordpress-1.2
//!         path: wordpress
//! absent:
//!   memcached:
//!     sources:
//!       - uri: git@github.com:example/kapps.git
//!         branch: master
//!         path: memcached
//! ```
//!
//! Parsing is strict: an unknown field in a source entry is a hard failure
//! so configuration typos surface before anything touches a cluster.
//! Manifest order is preserved — kapps are installed strictly in the order
//! they appear, since install-order dependencies are encoded only by
//! position.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};

/// One location a kapp's configuration is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    /// Acquirer type tag. Inferred from the URI when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquirer: Option<String>,
    /// Origin URI, e.g. a git remote.
    pub uri: String,
    /// Revision or branch to fetch.
    pub branch: String,
    /// Subpath within the fetched tree that holds the kapp.
    #[serde(default)]
    pub path: String,
    /// Display name. Defaults to the last path segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Source {
    /// The display name, defaulting to the last segment of `path`, falling
    /// back to the final component of the URI.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }

        let from_path = self.path.rsplit('/').find(|s| !s.is_empty());
        match from_path {
            Some(segment) => segment.to_string(),
            None => self
                .uri
                .rsplit(['/', ':'])
                .find(|s| !s.is_empty())
                .unwrap_or(&self.uri)
                .trim_end_matches(".git")
                .to_string(),
        }
    }
}

/// A unit of deployable workload configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kapp {
    pub id: String,
    /// Whether the kapp should be present after the run completes.
    pub should_be_present: bool,
    /// Explicit build-file selection when a kapp tree contains several.
    pub build_file: Option<String>,
    pub sources: Vec<Source>,
}

/// The raw per-kapp entry as it appears in a manifest document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KappEntry {
    #[serde(default)]
    sources: Vec<Source>,
    #[serde(default)]
    build_file: Option<String>,
}

const PRESENT_KEY: &str = "present";
const ABSENT_KEY: &str = "absent";

/// Parse a single manifest document into kapps, manifest order preserved.
pub fn parse_manifest_str(content: &str, origin: &str) -> Result<Vec<Kapp>> {
    let document: YamlValue = serde_yaml::from_str(content)?;

    let map = match document {
        YamlValue::Mapping(map) => map,
        YamlValue::Null => Mapping::new(),
        _ => {
            return Err(Error::Manifest {
                message: format!("{}: expected a mapping at the top level", origin),
            })
        }
    };

    for key in map.keys() {
        let key_str = key.as_str().unwrap_or_default();
        if key_str != PRESENT_KEY && key_str != ABSENT_KEY {
            return Err(Error::Manifest {
                message: format!(
                    "{}: unknown top-level key '{}' (expected '{}' or '{}')",
                    origin, key_str, PRESENT_KEY, ABSENT_KEY
                ),
            });
        }
    }

    let mut kapps = Vec::new();
    for (key, should_be_present) in [(PRESENT_KEY, true), (ABSENT_KEY, false)] {
        if let Some(section) = map.get(YamlValue::from(key)) {
            parse_section(section, should_be_present, origin, &mut kapps)?;
        }
    }

    debug!("Parsed {} kapp(s) from {}", kapps.len(), origin);

    Ok(kapps)
}

fn parse_section(
    section: &YamlValue,
    should_be_present: bool,
    origin: &str,
    kapps: &mut Vec<Kapp>,
) -> Result<()> {
    let entries = section.as_mapping().ok_or_else(|| Error::Manifest {
        message: format!(
            "{}: '{}' must map kapp ids to definitions",
            origin,
            if should_be_present {
                PRESENT_KEY
            } else {
                ABSENT_KEY
            }
        ),
    })?;

    for (id, value) in entries {
        let id = id.as_str().ok_or_else(|| Error::Manifest {
            message: format!("{}: kapp ids must be strings", origin),
        })?;

        let entry: KappEntry =
            serde_yaml::from_value(value.clone()).map_err(|e| Error::Manifest {
                message: format!("{}: kapp '{}': {}", origin, id, e),
            })?;

        if should_be_present && entry.sources.is_empty() {
            return Err(Error::Manifest {
                message: format!(
                    "{}: kapp '{}' is declared present but has no sources",
                    origin, id
                ),
            });
        }

        kapps.push(Kapp {
            id: id.to_string(),
            should_be_present,
            build_file: entry.build_file,
            sources: entry.sources,
        });
    }

    Ok(())
}

/// Parse one manifest file.
pub fn parse_manifest(path: &Path) -> Result<Vec<Kapp>> {
    debug!("Parsing manifest: {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|e| Error::Manifest {
        message: format!("couldn't read manifest {}: {}", path.display(), e),
    })?;
    parse_manifest_str(&content, &path.display().to_string())
}

/// Parse manifest files in order, concatenating their kapp lists.
///
/// Duplicate kapp identifiers across the aggregate are rejected: install
/// order is positional, and a silently duplicated id would make it
/// ambiguous which definition wins.
pub fn parse_manifests(paths: &[PathBuf]) -> Result<Vec<Kapp>> {
    debug!("Parsing {} manifest(s)", paths.len());

    let mut kapps: Vec<Kapp> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for path in paths {
        for kapp in parse_manifest(path)? {
            if !seen.insert(kapp.id.clone()) {
                return Err(Error::Manifest {
                    message: format!(
                        "kapp '{}' is defined more than once across the given manifests",
                        kapp.id
                    ),
                });
            }
            kapps.push(kapp);
        }
    }

    Ok(kapps)
}

//! Loading and layering of configuration values
//!
//! A [`Values`] mapping is the merged view of every value file that applies
//! to a stack: the files found in the provider's value directories, merged
//! in path order (later files override earlier keys), plus any values a
//! provider or provisioner derives at runtime. Values are recomputed per
//! run and never persisted.
//!
//! `serde_yaml::Mapping` preserves document order, which keeps everything
//! derived from values (flag lists, environment maps) deterministic.

use std::path::{Path, PathBuf};

use log::debug;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::merge::merge_mappings;

/// Merged configuration values for one stack.
pub type Values = Mapping;

/// Load a YAML file that must contain a top-level mapping.
pub fn load_yaml_file(path: &Path) -> Result<Mapping> {
    let content = std::fs::read_to_string(path)?;
    let value: YamlValue = serde_yaml::from_str(&content)?;

    match value {
        YamlValue::Mapping(map) => Ok(map),
        YamlValue::Null => Ok(Mapping::new()),
        other => Err(Error::Config {
            message: format!(
                "expected a YAML mapping in {}, got {}",
                path.display(),
                yaml_type_name(&other)
            ),
            hint: None,
        }),
    }
}

/// Collect the value files under each directory, in directory order.
///
/// Within a directory, files are sorted by name so layering is stable
/// across platforms. Only `.yaml`/`.yml` files are considered.
pub fn collect_values_files(dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for dir in dirs {
        if dir.is_file() {
            files.push(dir.clone());
            continue;
        }

        let mut dir_files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        dir_files.sort();
        files.extend(dir_files);
    }

    Ok(files)
}

/// Load and merge the given value files in order. Later files override
/// earlier keys.
pub fn merge_values_files(paths: &[PathBuf]) -> Result<Values> {
    let mut merged = Mapping::new();

    for path in paths {
        debug!("Loading values from {}", path.display());
        let layer = load_yaml_file(path)?;
        merge_mappings(&mut merged, &layer);
    }

    Ok(merged)
}

/// Look up a string value by key.
pub fn get_string(values: &Values, key: &str) -> Option<String> {
    values
        .get(YamlValue::from(key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Render a scalar YAML value the way it would appear on a command line.
pub fn scalar_to_string(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => String::new(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

fn yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

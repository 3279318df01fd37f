//! Deep merging of YAML values
//!
//! This is the merge used both for layering value files and for the
//! convergence protocol: a desired spec is merged onto the configuration
//! downloaded from the cluster-management tool before being re-applied.
//!
//! Semantics are override-wins and additive:
//!
//! - Mappings merge recursively; keys present only in the target are
//!   preserved untouched.
//! - Everything else — scalars and sequences — is replaced by the source
//!   value. Sequences are never appended, so a desired list fully describes
//!   the resulting list.
//!
//! Merging the same source twice yields the same result as merging it once,
//! which is what makes the patch-merge-reapply cycle safe to re-run.

use log::debug;
use serde_yaml::{Mapping, Value as YamlValue};

/// Recursively merge `source` into `target` with override-wins semantics.
pub fn merge_values(target: &mut YamlValue, source: &YamlValue) {
    match (target, source) {
        (YamlValue::Mapping(target_map), YamlValue::Mapping(source_map)) => {
            merge_mappings(target_map, source_map);
        }
        (target, source) => {
            *target = source.clone();
        }
    }
}

/// Recursively merge `source` into `target` at the mapping level.
pub fn merge_mappings(target: &mut Mapping, source: &Mapping) {
    for (key, value) in source {
        match target.get_mut(key) {
            Some(existing) => {
                if existing.is_mapping() && value.is_mapping() {
                    merge_values(existing, value);
                } else {
                    if existing != value {
                        debug!("Overriding value at key {:?}", key);
                    }
                    *existing = value.clone();
                }
            }
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

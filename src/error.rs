//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! stackform. It uses the `thiserror` library to create a single `Error`
//! enum covering every anticipated failure mode, with contextual fields so
//! failures surface with enough information to act on.
//!
//! The taxonomy distinguishes:
//!
//! - `Config` — malformed or incomplete user configuration; surfaced to the
//!   user, never retried.
//! - `Manifest` — a malformed kapp manifest; the process aborts before
//!   touching any cluster.
//! - `MissingDirectory` — the value-directory convention is violated;
//!   surfaced with the exact expected path.
//! - `Timeout` — a deadline-bounded external check expired; surfaced with a
//!   credentials/connectivity hint where appropriate.
//! - `ExternalTool` — a subprocess exited non-zero; surfaced with the
//!   originating command and its captured output.
//! - `NotFound` — a required build file is absent.
//! - `Convergence` — the collected per-sub-resource failures from a
//!   best-effort patch cycle.
//!
//! None of these are retried anywhere in the crate: operators re-invoke the
//! tool, and the reconciliation protocol is idempotent so re-invocation is
//! safe.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for stackform operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete user configuration.
    ///
    /// Includes the specific issue and optionally a hint about how to fix
    /// it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A malformed kapp manifest.
    #[error("Manifest error: {message}")]
    Manifest { message: String },

    /// A directory required by the value-directory convention is missing.
    #[error("Missing directory: {}", path.display())]
    MissingDirectory { path: PathBuf },

    /// A deadline-bounded external check did not return in time.
    #[error("Timed out {task}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Timeout {
        task: String,
        /// Optional hint, e.g. pointing at credentials or connectivity
        hint: Option<String>,
    },

    /// An external tool exited non-zero.
    #[error("Command failed: {command}\n-- stdout --\n{stdout}\n-- stderr --\n{stderr}")]
    ExternalTool {
        command: String,
        stdout: String,
        stderr: String,
    },

    /// A required file (e.g. a kapp's build file) is absent.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// One or more sub-resource patches failed during a best-effort
    /// convergence cycle. Every failure is listed, not just the first.
    #[error("Failed to converge {} sub-resource(s):\n{}", failures.len(), failures.join("\n"))]
    Convergence { failures: Vec<String> },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let error = Error::Config {
            message: "provisioner 'kopz' doesn't exist".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("kopz"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_with_hint() {
        let error = Error::Config {
            message: "stack 'dev9' not found".to_string(),
            hint: Some("Did you mean 'dev1'?".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("stack 'dev9' not found"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Did you mean 'dev1'?"));
    }

    #[test]
    fn test_error_display_missing_directory() {
        let error = Error::MissingDirectory {
            path: PathBuf::from("/stacks/aws/profiles/dev"),
        };
        let display = format!("{}", error);
        assert!(display.contains("Missing directory"));
        assert!(display.contains("/stacks/aws/profiles/dev"));
    }

    #[test]
    fn test_error_display_timeout_with_hint() {
        let error = Error::Timeout {
            task: "retrieving cluster config".to_string(),
            hint: Some("Check your credentials and connectivity".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Timed out retrieving cluster config"));
        assert!(display.contains("Check your credentials"));
    }

    #[test]
    fn test_error_display_external_tool() {
        let error = Error::ExternalTool {
            command: "kops create cluster --zones eu-west-1a".to_string(),
            stdout: String::new(),
            stderr: "error creating cluster".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Command failed"));
        assert!(display.contains("kops create cluster"));
        assert!(display.contains("error creating cluster"));
    }

    #[test]
    fn test_error_display_convergence_lists_all_failures() {
        let error = Error::Convergence {
            failures: vec![
                "instance group 'nodes': replace failed".to_string(),
                "instance group 'masters': replace failed".to_string(),
            ],
        };
        let display = format!("{}", error);
        assert!(display.contains("2 sub-resource(s)"));
        assert!(display.contains("'nodes'"));
        assert!(display.contains("'masters'"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_str = "invalid: [unclosed";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: Error = yaml_error.into();
        let display = format!("{}", error);
        assert!(display.contains("YAML parsing error"));
    }
}

//! # Stackform Library
//!
//! This library provides the core functionality for provisioning and
//! converging Kubernetes-style clusters ("stacks") and installing their
//! workloads ("kapps") from declarative YAML configuration. It is designed
//! to be used by the `stackform` command-line tool but can also be embedded
//! in other applications.
//!
//! ## Core Concepts
//!
//! - **Stack configuration (`stack`)**: the resolved desired state for one
//!   invocation, merged from a stack file and CLI overrides.
//! - **Values (`vars`, `merge`)**: the layered YAML values that
//!   parameterize providers, provisioners and installers.
//! - **Manifests (`manifest`)**: declarations of which kapps should be
//!   present or absent, each kapp sourced via an acquirer.
//! - **Acquirers (`acquirer`)**: strategies that fetch kapp sources into a
//!   local cache, idempotently.
//! - **Providers (`provider`)**: backends supplying environment-specific
//!   values and the value-directory convention.
//! - **Provisioners (`provisioner`)**: the create → patch → converge state
//!   machine over an external cluster-management tool.
//! - **Cluster source of truth (`clustersot`)**: live online/ready
//!   inspection, independent of how the cluster was created.
//! - **Installers (`installer`)**: capability-driven environment and
//!   argument composition around an external build tool.
//! - **Lifecycle (`lifecycle`)**: the orchestrator sequencing all of the
//!   above.
//!
//! ## Execution Flow
//!
//! `cluster create` resolves the stack config, constructs the provider and
//! provisioner, checks whether the cluster is already online, creates and
//! converges it, then polls the source of truth until the cluster is
//! online and ready within the configured timeouts. `kapps install` parses
//! the manifests and, strictly in manifest order, acquires and installs
//! each kapp.

pub mod acquirer;
pub mod clustersot;
pub mod error;
pub mod exec;
pub mod installer;
pub mod lifecycle;
pub mod manifest;
pub mod merge;
pub mod output;
pub mod provider;
pub mod provisioner;
pub mod stack;
pub mod suggestions;
pub mod vars;

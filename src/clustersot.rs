//! # Cluster Source of Truth
//!
//! The cluster source of truth answers "is the cluster online?" and "is it
//! ready for workloads?" by inspecting live state, independently of
//! whatever provisioner created the cluster. The kubectl variant asks the
//! API server directly:
//!
//! - online: the `kube-system` namespace is retrievable;
//! - ready: every node reports a `Ready=True` condition.
//!
//! Both checks run under a short deadline so a wedged API server or bad
//! credentials surface as a distinct timeout, not an indefinite hang. The
//! results are returned to the caller — the orchestrator records them on
//! its `ClusterStatus` — rather than mutated into shared state.

use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::exec::{self, ToolCommand};
use crate::stack::StackConfig;
use crate::suggestions;
use crate::vars::{self, Values};

/// Source-of-truth names the factory accepts.
pub const KNOWN_CLUSTER_SOTS: &[&str] = &["kubectl"];

/// Deadline for individual inspection calls.
const INSPECT_DEADLINE: Duration = Duration::from_secs(5);

/// Live-state inspector for online/ready status.
pub trait ClusterSot {
    fn is_online(&self, stack: &StackConfig, values: &Values) -> Result<bool>;
    fn is_ready(&self, stack: &StackConfig, values: &Values) -> Result<bool>;
}

/// Construct the source of truth with the given name.
pub fn new_cluster_sot(name: &str) -> Result<Box<dyn ClusterSot>> {
    match name {
        "kubectl" => Ok(Box::new(KubectlClusterSot)),
        other => Err(suggestions::unknown_backend(
            "cluster source of truth",
            other,
            KNOWN_CLUSTER_SOTS,
        )),
    }
}

/// Inspects cluster state through kubectl.
pub struct KubectlClusterSot;

const KUBECTL_PATH: &str = "kubectl";

impl KubectlClusterSot {
    fn context(stack: &StackConfig, values: &Values) -> String {
        vars::get_string(values, "kube_context").unwrap_or_else(|| stack.cluster.clone())
    }
}

impl ClusterSot for KubectlClusterSot {
    fn is_online(&self, stack: &StackConfig, values: &Values) -> Result<bool> {
        let context = Self::context(stack, values);
        let command = ToolCommand::new(KUBECTL_PATH)
            .args(["--context", context.as_str()])
            .args(["get", "namespace", "kube-system"]);

        let output = exec::run_with_deadline(
            &command,
            INSPECT_DEADLINE,
            "checking whether the cluster is online",
            Some("Check your credentials and connectivity"),
        )?;

        debug!("Cluster '{}' online: {}", stack.cluster, output.success);

        Ok(output.success)
    }

    fn is_ready(&self, stack: &StackConfig, values: &Values) -> Result<bool> {
        let context = Self::context(stack, values);
        let command = ToolCommand::new(KUBECTL_PATH)
            .args(["--context", context.as_str()])
            .args(["get", "nodes", "-o", "json"]);

        let output = exec::run_with_deadline(
            &command,
            INSPECT_DEADLINE,
            "checking whether the cluster is ready",
            Some("Check your credentials and connectivity"),
        )?;

        if !output.success {
            debug!("Couldn't list nodes for '{}': {}", stack.cluster, output.stderr.trim());
            return Ok(false);
        }

        nodes_ready(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    status: NodeStatus,
}

#[derive(Debug, Default, Deserialize)]
struct NodeStatus {
    #[serde(default)]
    conditions: Vec<NodeCondition>,
}

#[derive(Debug, Deserialize)]
struct NodeCondition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

/// A cluster is ready when it has at least one node and every node reports
/// a `Ready=True` condition.
fn nodes_ready(node_list_json: &str) -> Result<bool> {
    let nodes: NodeList = serde_json::from_str(node_list_json).map_err(|e| Error::Config {
        message: format!("couldn't parse node list from kubectl: {}", e),
        hint: None,
    })?;

    if nodes.items.is_empty() {
        return Ok(false);
    }

    let ready = nodes.items.iter().all(|node| {
        node.status
            .conditions
            .iter()
            .any(|c| c.kind == "Ready" && c.status == "True")
    });

    Ok(ready)
}

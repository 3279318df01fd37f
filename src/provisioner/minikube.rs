//! The minikube provisioner
//!
//! Local clusters are started out of band (minikube manages its own
//! lifecycle), so create and update don't converge anything here. The
//! source of truth still inspects the live cluster, which is what makes
//! `is_already_online` meaningful for local stacks.

use log::debug;

use crate::clustersot::{self, ClusterSot};
use crate::error::Result;
use crate::provider::Provider;
use crate::stack::StackConfig;

use super::{CreateOutcome, Provisioner};

pub struct MinikubeProvisioner {
    cluster_sot: Box<dyn ClusterSot>,
}

impl MinikubeProvisioner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cluster_sot: clustersot::new_cluster_sot("kubectl")?,
        })
    }
}

impl Provisioner for MinikubeProvisioner {
    fn create(
        &self,
        stack: &StackConfig,
        _provider: &dyn Provider,
        _dry_run: bool,
    ) -> Result<CreateOutcome> {
        debug!(
            "Nothing to create for local cluster '{}'; start it with minikube",
            stack.cluster
        );
        Ok(CreateOutcome::default())
    }

    fn update(
        &self,
        stack: &StackConfig,
        _provider: &dyn Provider,
        _dry_run: bool,
    ) -> Result<CreateOutcome> {
        debug!("Nothing to update for local cluster '{}'", stack.cluster);
        Ok(CreateOutcome::default())
    }

    fn is_already_online(&self, stack: &StackConfig, provider: &dyn Provider) -> Result<bool> {
        self.cluster_sot.is_online(stack, provider.vars())
    }

    fn cluster_sot(&self) -> &dyn ClusterSot {
        self.cluster_sot.as_ref()
    }
}

//! # Cluster and kapp lifecycle orchestration
//!
//! The thin sequencing layer over the library pieces. `create_cluster`
//! drives one cluster to online-and-ready:
//!
//! 1. short-circuit if the cluster is already online;
//! 2. create/converge it through the provisioner;
//! 3. wait out the provisioner's settle delay;
//! 4. poll the source of truth until the cluster is online, then ready,
//!    each within its configured timeout budget.
//!
//! `install_kapps` walks a parsed manifest strictly in order — kapps may
//! have install-order dependencies encoded only by their position — and
//! acquires then installs each one.
//!
//! This module owns the run's [`ClusterStatus`] and is the only place that
//! updates it, from the explicit results the backends return.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::acquirer;
use crate::error::{Error, Result};
use crate::installer;
use crate::manifest::Kapp;
use crate::provider::Provider;
use crate::provisioner::Provisioner;
use crate::stack::{ClusterStatus, StackConfig};

/// Interval between source-of-truth polls.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Create a cluster and wait for it to become online and ready.
pub fn create_cluster(
    stack: &StackConfig,
    provider: &dyn Provider,
    provisioner: &dyn Provisioner,
    dry_run: bool,
) -> Result<ClusterStatus> {
    let mut status = ClusterStatus::default();

    if provisioner.is_already_online(stack, provider)? && !dry_run {
        info!(
            "Cluster '{}' is already online. Nothing to do.",
            stack.cluster
        );
        status.is_online = true;
        return Ok(status);
    }

    let outcome = provisioner.create(stack, provider, dry_run)?;

    if dry_run {
        info!("Dry run. Skipping cluster readiness checks.");
        return Ok(status);
    }

    status.started_this_run = outcome.started_this_run;
    status.sleep_before_ready_check = outcome.settle_before_ready_check;

    // Only settle if we actually started the cluster this run: convergence
    // kicks off asynchronous node replacement.
    if status.started_this_run && !outcome.settle_before_ready_check.is_zero() {
        info!(
            "Sleeping {}s before checking the cluster...",
            outcome.settle_before_ready_check.as_secs()
        );
        std::thread::sleep(outcome.settle_before_ready_check);
    }

    let sot = provisioner.cluster_sot();

    wait_until(
        "come online",
        stack.online_timeout(),
        POLL_INTERVAL,
        || sot.is_online(stack, provider.vars()),
    )?;
    status.is_online = true;
    info!("Cluster '{}' is online", stack.cluster);

    wait_until(
        "become ready",
        stack.ready_timeout(),
        POLL_INTERVAL,
        || sot.is_ready(stack, provider.vars()),
    )?;
    status.is_ready = true;
    info!("Cluster '{}' is ready for use", stack.cluster);

    Ok(status)
}

/// Poll `check` until it reports true or the timeout budget is exhausted.
///
/// Individual check timeouts (a wedged API server) count as "not yet" and
/// polling continues; any other check error aborts the wait.
pub fn wait_until<F>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    let started = Instant::now();

    loop {
        match check() {
            Ok(true) => return Ok(()),
            Ok(false) => debug!("Cluster hasn't {} yet", what),
            Err(Error::Timeout { task, .. }) => {
                warn!("Check timed out ({}); will retry", task);
            }
            Err(e) => return Err(e),
        }

        if started.elapsed() >= timeout {
            return Err(Error::Timeout {
                task: format!(
                    "waiting for the cluster to {} (budget {}s)",
                    what,
                    timeout.as_secs()
                ),
                hint: None,
            });
        }

        std::thread::sleep(interval);
    }
}

/// Fetch every source of a kapp into the cache and return the kapp's root
/// directory (the first source's checkout plus its subpath).
pub fn acquire_kapp(kapp: &Kapp, cache_root: &Path) -> Result<PathBuf> {
    let mut root: Option<PathBuf> = None;

    for source in &kapp.sources {
        let acquirer = acquirer::new_acquirer(source)?;
        let dest = acquirer::cache_dir(cache_root, acquirer.as_ref());

        acquirer.fetch(&dest)?;

        let source_root = if source.path.is_empty() {
            dest
        } else {
            dest.join(&source.path)
        };

        if root.is_none() {
            root = Some(source_root);
        }
    }

    root.ok_or_else(|| Error::Manifest {
        message: format!("kapp '{}' has no sources to acquire", kapp.id),
    })
}

/// Install kapps strictly in manifest order.
pub fn install_kapps(
    kapps: &[Kapp],
    stack: &StackConfig,
    provider: &dyn Provider,
    cache_root: &Path,
    approved: bool,
    dry_run: bool,
) -> Result<()> {
    let installer = installer::new_installer("make")?;

    for kapp in kapps {
        if !kapp.should_be_present {
            // Removal of absent kapps is out of scope; they parse and
            // round-trip but aren't touched here.
            debug!("Skipping absent kapp '{}'", kapp.id);
            continue;
        }

        let kapp_root = acquire_kapp(kapp, cache_root)?;
        installer.install(kapp, &kapp_root, stack, provider, approved, dry_run)?;
    }

    Ok(())
}

/// Destroy present kapps in reverse manifest order.
pub fn destroy_kapps(
    kapps: &[Kapp],
    stack: &StackConfig,
    provider: &dyn Provider,
    cache_root: &Path,
    approved: bool,
    dry_run: bool,
) -> Result<()> {
    let installer = installer::new_installer("make")?;

    for kapp in kapps.iter().rev() {
        if !kapp.should_be_present {
            debug!("Skipping absent kapp '{}'", kapp.id);
            continue;
        }

        let kapp_root = acquire_kapp(kapp, cache_root)?;
        installer.destroy(kapp, &kapp_root, stack, provider, approved, dry_run)?;
    }

    Ok(())
}

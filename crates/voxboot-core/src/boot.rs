//! Bootstrap orchestration: provision artifacts, resolve the text
//! frontend, then hand the process over to a server implementation.

use std::time::Duration;

use tracing::{info, warn};

use crate::acquire::{Acquirer, AcquisitionOutcome};
use crate::config::BootConfig;
use crate::error::{BootError, best_effort};
use crate::frontend::FrontendResolver;
use crate::launch::{self, LaunchArgs};
use crate::pkg::{PackageHost, PipHost};
use crate::provider::{GitProvider, RegistryProvider};
use crate::store::{self, ArtifactStatus};

/// Grace period for container filesystems that mount a moment after start.
const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Crashes the inference stack when co-installed; removed up front.
const INCOMPATIBLE_PACKAGE: &str = "deepspeed";

/// Run the boot sequence.
///
/// On success the process image is replaced and this function never
/// returns; every return value is therefore a fatal error carrying its
/// exit code.
pub fn run(config: &BootConfig) -> BootError {
    std::thread::sleep(SETTLE_DELAY);

    let pip = PipHost::new(config.python.clone());
    best_effort(
        &format!("{INCOMPATIBLE_PACKAGE} uninstall"),
        pip.uninstall(INCOMPATIBLE_PACKAGE),
    );

    let git = GitProvider::new(config.registry_url.clone());
    let registry = RegistryProvider::new(config.registry_url.clone());
    let acquirer = Acquirer::new(&git, &registry);

    match acquirer.acquire(&config.model_id, &config.model_dir, config.acquire_policy) {
        AcquisitionOutcome::Present => {}
        AcquisitionOutcome::Acquired(kind) => info!("model ready via {kind} provider"),
        AcquisitionOutcome::Failed(err) => warn!("model download failed: {err:#}"),
    }
    if store::probe(&config.model_dir) == ArtifactStatus::Absent {
        return BootError::ModelMissing(config.model_dir.clone());
    }

    match acquirer.acquire(
        &config.resource_id,
        &config.resource_dir,
        config.acquire_policy,
    ) {
        AcquisitionOutcome::Present => {}
        AcquisitionOutcome::Acquired(kind) => info!("resource package ready via {kind} provider"),
        AcquisitionOutcome::Failed(err) => {
            warn!("resource package download failed, frontend falls back to wetext: {err:#}");
        }
    }

    let resolver = FrontendResolver::new(&pip);
    let decision = match resolver.resolve(config.frontend_policy, &config.resource_dir) {
        Ok(decision) => decision,
        Err(err) => return err,
    };
    info!("text frontend: {decision}");

    let candidate = match launch::select(&config.runtime_dir, config.server_choice) {
        Ok(candidate) => candidate,
        Err(err) => return err,
    };
    let args = LaunchArgs::new(&config.host, config.port, config.max_conc, &config.model_dir);
    launch::launch(&config.python, &config.runtime_dir, candidate, &args)
}

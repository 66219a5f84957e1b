//! Fatal boot errors and the best-effort escape hatch.

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// A condition the boot sequence cannot continue past.
///
/// Every variant maps to its own exit code; container orchestration keys on
/// the code to distinguish failure classes.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("no server implementation found under {0}")]
    NoCandidate(PathBuf),

    #[error("model directory missing or empty after download: {0}")]
    ModelMissing(PathBuf),

    #[error("http server requested but {0} does not exist")]
    HttpUnavailable(PathBuf),

    #[error("grpc server requested but {0} does not exist")]
    GrpcUnavailable(PathBuf),

    #[error("ttsfrd installed but import verification failed")]
    FrontendVerifyFailed,

    #[error("ttsfrd installation failed: {0:#}")]
    FrontendInstallFailed(anyhow::Error),

    #[error("failed to start {candidate} server: {source}")]
    LaunchFailed {
        candidate: String,
        #[source]
        source: std::io::Error,
    },
}

impl BootError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCandidate(_) => 1,
            Self::ModelMissing(_) => 2,
            Self::HttpUnavailable(_) => 3,
            Self::GrpcUnavailable(_) => 4,
            Self::FrontendVerifyFailed => 5,
            Self::FrontendInstallFailed(_) => 6,
            Self::LaunchFailed { .. } => 7,
        }
    }
}

/// Run a side action that is allowed to fail.
///
/// The outcome is logged and discarded instead of propagated, so call sites
/// show at a glance which steps may be skipped.
pub fn best_effort<T>(label: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{label} skipped: {err:#}");
            None
        }
    }
}

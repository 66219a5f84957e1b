//! Immutable boot configuration.

use std::path::PathBuf;

use url::Url;

use crate::acquire::AcquirePolicy;
use crate::frontend::FrontendPolicy;
use crate::launch::ServerChoice;

/// Snapshot of every environment-derived setting.
///
/// Constructed once by the frontend at process start and passed by
/// reference everywhere; the ambient environment is never re-read mid-run.
#[derive(Debug, Clone)]
pub struct BootConfig {
    /// Model artifact identifier on the registry.
    pub model_id: String,
    /// Where the model artifact must end up.
    pub model_dir: PathBuf,
    /// Linguistic-resource artifact identifier on the registry.
    pub resource_id: String,
    /// Where the resource artifact must end up.
    pub resource_dir: PathBuf,
    /// Registry base URL shared by both providers.
    pub registry_url: Url,

    /// Bind host forwarded to the launched server.
    pub host: String,
    /// Bind port forwarded to the launched server.
    pub port: u16,
    /// Concurrency limit, forwarded to the grpc server only.
    pub max_conc: u32,

    pub acquire_policy: AcquirePolicy,
    pub frontend_policy: FrontendPolicy,
    pub server_choice: ServerChoice,

    /// Root directory holding the bundled server implementations.
    pub runtime_dir: PathBuf,
    /// Interpreter used for package installs and the final handoff.
    pub python: PathBuf,
}

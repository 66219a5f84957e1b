//! Voxboot - speech-synthesis service bootstrapper
//!
//! Provisions model artifacts, resolves the ttsfrd text frontend, then
//! replaces itself with one of the bundled inference servers. Every flag
//! is also readable from the environment, which is how containers drive
//! this binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use voxboot_core::acquire::AcquirePolicy;
use voxboot_core::boot;
use voxboot_core::config::BootConfig;
use voxboot_core::frontend::FrontendPolicy;
use voxboot_core::launch::ServerChoice;

#[derive(Parser)]
#[command(name = "voxboot")]
#[command(about = "Speech-synthesis service bootstrapper", long_about = None)]
struct Cli {
    /// Model artifact identifier
    #[arg(long, env = "MODEL_ID", default_value = "iic/CosyVoice2-0.5B")]
    model_id: String,

    /// Model target directory
    #[arg(long, env = "MODEL_DIR", default_value = "/models/CosyVoice2-0.5B")]
    model_dir: PathBuf,

    /// Linguistic-resource artifact identifier
    #[arg(long, env = "TTSFRD_ID", default_value = "iic/CosyVoice-ttsfrd")]
    ttsfrd_id: String,

    /// Linguistic-resource target directory
    #[arg(long, env = "TTSFRD_DIR", default_value = "/models/CosyVoice-ttsfrd")]
    ttsfrd_dir: PathBuf,

    /// Artifact registry base URL
    #[arg(long, env = "REGISTRY_URL", default_value = "https://www.modelscope.cn")]
    registry_url: Url,

    /// Bind host forwarded to the launched server
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port forwarded to the launched server
    #[arg(long, env = "PORT", default_value_t = 50000)]
    port: u16,

    /// Concurrency limit (grpc server only)
    #[arg(long, env = "MAX_CONC", default_value_t = 4)]
    max_conc: u32,

    /// How to download artifacts
    #[arg(long, env = "DOWNLOAD_METHOD", default_value = "auto")]
    download_method: DownloadMethod,

    /// Text frontend policy
    #[arg(long, env = "TTSFRD_MODE", default_value = "auto")]
    ttsfrd_mode: TtsfrdMode,

    /// Attempt a local ttsfrd wheel install under the auto policy
    #[arg(long, env = "INSTALL_TTSFRD", default_value_t = false)]
    install_ttsfrd: bool,

    /// Which server implementation to launch
    #[arg(long, env = "SERVER_IMPL", default_value = "auto")]
    server_impl: ServerImpl,

    /// Directory holding the bundled server implementations
    #[arg(long, env = "RUNTIME_DIR", default_value = "runtime/python")]
    runtime_dir: PathBuf,

    /// Python interpreter used for installs and the final handoff
    #[arg(long, env = "PYTHON", default_value = "python3")]
    python: PathBuf,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum DownloadMethod {
    /// Shallow git clone only
    Git,
    /// Registry snapshot download only
    Registry,
    /// Git first, registry snapshot as fallback
    #[default]
    Auto,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum TtsfrdMode {
    /// Require ttsfrd; boot fails if it cannot be verified
    Enabled,
    /// Remove ttsfrd and use the wetext fallback
    Disabled,
    /// Probe and take whatever is importable
    #[default]
    Auto,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum ServerImpl {
    /// First available implementation
    #[default]
    Auto,
    /// HTTP server
    #[value(alias = "fastapi")]
    Http,
    /// gRPC server
    Grpc,
}

impl Cli {
    fn into_config(self) -> BootConfig {
        BootConfig {
            model_id: self.model_id,
            model_dir: self.model_dir,
            resource_id: self.ttsfrd_id,
            resource_dir: self.ttsfrd_dir,
            registry_url: self.registry_url,
            host: self.host,
            port: self.port,
            max_conc: self.max_conc,
            acquire_policy: match self.download_method {
                DownloadMethod::Git => AcquirePolicy::Git,
                DownloadMethod::Registry => AcquirePolicy::Registry,
                DownloadMethod::Auto => AcquirePolicy::Auto,
            },
            frontend_policy: match self.ttsfrd_mode {
                TtsfrdMode::Enabled => FrontendPolicy::Enabled,
                TtsfrdMode::Disabled => FrontendPolicy::Disabled,
                TtsfrdMode::Auto => FrontendPolicy::Auto {
                    install_local: self.install_ttsfrd,
                },
            },
            server_choice: match self.server_impl {
                ServerImpl::Auto => ServerChoice::Auto,
                ServerImpl::Http => ServerChoice::Http,
                ServerImpl::Grpc => ServerChoice::Grpc,
            },
            runtime_dir: self.runtime_dir,
            python: self.python,
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.into_config();

    // run() only comes back on a fatal error; success is an exec-replace.
    let err = boot::run(&config);
    tracing::error!("{err}");
    std::process::exit(err.exit_code());
}

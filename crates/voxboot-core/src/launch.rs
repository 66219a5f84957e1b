//! Downstream server selection and process handoff.
//!
//! Candidates are located by fixed relative paths under the runtime root;
//! presence is a file-exists probe, nothing deeper. Launch replaces this
//! process's image, so on success nothing here ever returns.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::BootError;

/// Explicit override, or scan in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerChoice {
    Auto,
    Http,
    Grpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    Http,
    Grpc,
}

impl std::fmt::Display for ServerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerKind::Http => write!(f, "http"),
            ServerKind::Grpc => write!(f, "grpc"),
        }
    }
}

/// A launchable server implementation and its argument contract.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub kind: ServerKind,
    script: &'static str,
    contract: &'static [&'static str],
}

const HTTP: Candidate = Candidate {
    kind: ServerKind::Http,
    script: "fastapi/server.py",
    contract: &["host", "port", "model_dir"],
};

const GRPC: Candidate = Candidate {
    kind: ServerKind::Grpc,
    script: "grpc/server.py",
    contract: &["host", "port", "max_conc", "model_dir"],
};

/// Scan order doubles as auto-selection priority.
pub static CANDIDATES: [Candidate; 2] = [HTTP, GRPC];

impl Candidate {
    pub fn script_path(&self, runtime_root: &Path) -> PathBuf {
        runtime_root.join(self.script)
    }

    pub fn present(&self, runtime_root: &Path) -> bool {
        self.script_path(runtime_root).is_file()
    }

    pub fn accepts_arg(&self, name: &str) -> bool {
        self.contract.contains(&name)
    }
}

/// Pick the server implementation to hand off to.
///
/// An explicit choice is honored or fatal; there is no fallback when the
/// caller named a candidate. `Auto` takes the first present candidate.
pub fn select(runtime_root: &Path, choice: ServerChoice) -> Result<&'static Candidate, BootError> {
    match choice {
        ServerChoice::Http => {
            if HTTP.present(runtime_root) {
                Ok(&HTTP)
            } else {
                Err(BootError::HttpUnavailable(HTTP.script_path(runtime_root)))
            }
        }
        ServerChoice::Grpc => {
            if GRPC.present(runtime_root) {
                Ok(&GRPC)
            } else {
                Err(BootError::GrpcUnavailable(GRPC.script_path(runtime_root)))
            }
        }
        ServerChoice::Auto => CANDIDATES
            .iter()
            .find(|candidate| candidate.present(runtime_root))
            .ok_or_else(|| BootError::NoCandidate(runtime_root.to_path_buf())),
    }
}

/// Launch arguments in the order the server contracts list them.
#[derive(Debug, Clone)]
pub struct LaunchArgs {
    pairs: Vec<(&'static str, String)>,
}

impl LaunchArgs {
    pub fn new(host: &str, port: u16, max_conc: u32, model_dir: &Path) -> Self {
        Self {
            pairs: vec![
                ("host", host.to_string()),
                ("port", port.to_string()),
                ("max_conc", max_conc.to_string()),
                ("model_dir", model_dir.display().to_string()),
            ],
        }
    }

    /// Build the candidate's argument vector, dropping anything outside its
    /// contract. The servers reject unknown flags at startup, so filtering
    /// is mandatory.
    pub fn filtered_for(&self, candidate: &Candidate) -> Vec<String> {
        let mut argv = Vec::new();
        for (name, value) in &self.pairs {
            if candidate.accepts_arg(name) {
                argv.push(format!("--{name}"));
                argv.push(value.clone());
            }
        }
        argv
    }
}

/// Replace this process with the candidate's server.
///
/// Returns only if the replacement itself failed.
pub fn launch(
    python: &Path,
    runtime_root: &Path,
    candidate: &Candidate,
    args: &LaunchArgs,
) -> BootError {
    let script = candidate.script_path(runtime_root);
    let argv = args.filtered_for(candidate);
    info!("starting {} server: {}", candidate.kind, script.display());

    let mut command = Command::new(python);
    command.arg(&script).args(&argv);
    let err = exec_replace(command);
    BootError::LaunchFailed {
        candidate: candidate.kind.to_string(),
        source: err,
    }
}

#[cfg(unix)]
fn exec_replace(mut command: Command) -> std::io::Error {
    use std::os::unix::process::CommandExt;
    command.exec()
}

#[cfg(not(unix))]
fn exec_replace(mut command: Command) -> std::io::Error {
    // No exec on this platform: run the server as a child and forward its
    // exit status verbatim.
    match command.status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn runtime_with(servers: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for script in servers {
            let path = dir.path().join(script);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"# server").unwrap();
        }
        dir
    }

    #[test]
    fn auto_prefers_http() {
        let dir = runtime_with(&["fastapi/server.py", "grpc/server.py"]);
        let candidate = select(dir.path(), ServerChoice::Auto).unwrap();
        assert_eq!(candidate.kind, ServerKind::Http);
    }

    #[test]
    fn auto_falls_back_to_grpc() {
        let dir = runtime_with(&["grpc/server.py"]);
        let candidate = select(dir.path(), ServerChoice::Auto).unwrap();
        assert_eq!(candidate.kind, ServerKind::Grpc);
    }

    #[test]
    fn auto_with_no_candidate_is_fatal() {
        let dir = runtime_with(&[]);
        let err = select(dir.path(), ServerChoice::Auto).unwrap_err();
        assert!(matches!(err, BootError::NoCandidate(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn explicit_grpc_never_falls_back_to_http() {
        let dir = runtime_with(&["fastapi/server.py"]);
        let err = select(dir.path(), ServerChoice::Grpc).unwrap_err();
        assert!(matches!(err, BootError::GrpcUnavailable(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn explicit_http_missing_is_fatal() {
        let dir = runtime_with(&["grpc/server.py"]);
        let err = select(dir.path(), ServerChoice::Http).unwrap_err();
        assert!(matches!(err, BootError::HttpUnavailable(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn http_contract_excludes_max_conc() {
        let args = LaunchArgs::new("0.0.0.0", 50000, 4, Path::new("/models/m"));
        let argv = args.filtered_for(&HTTP);
        assert!(!argv.contains(&"--max_conc".to_string()));
        assert_eq!(
            argv,
            vec!["--host", "0.0.0.0", "--port", "50000", "--model_dir", "/models/m"]
        );
    }

    #[test]
    fn grpc_contract_is_complete_and_ordered() {
        let args = LaunchArgs::new("0.0.0.0", 50000, 4, Path::new("/models/m"));
        let argv = args.filtered_for(&GRPC);
        assert_eq!(
            argv,
            vec![
                "--host",
                "0.0.0.0",
                "--port",
                "50000",
                "--max_conc",
                "4",
                "--model_dir",
                "/models/m"
            ]
        );
    }
}

//! Text-frontend capability resolution.
//!
//! Decides between the proprietary `ttsfrd` normalization backend and the
//! `wetext` fallback. Three policy paths, each terminal: Disabled removes
//! the backend, Enabled requires it (fatal on failure), Auto takes
//! whatever an optional local install attempt plus an import probe yields.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::error::{BootError, best_effort};
use crate::pkg::PackageHost;

/// The proprietary normalization backend.
pub const BACKEND: &str = "ttsfrd";
/// Pure-Python fallback used whenever the backend is not enabled.
pub const FALLBACK: &str = "wetext";

/// Index package names, dependency first.
const BACKEND_PACKAGES: [&str; 2] = ["ttsfrd_dependency", "ttsfrd"];

/// Auxiliary resource bundle shipped inside the resource artifact.
const RESOURCE_ARCHIVE: &str = "resource.zip";

/// Policy selecting how the backend is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendPolicy {
    /// The backend must end up importable; anything less is fatal.
    Enabled,
    /// Remove the backend and use the fallback.
    Disabled,
    /// Best-effort: probe, optionally after a local install attempt.
    Auto { install_local: bool },
}

/// Exactly one frontend is active after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendDecision {
    Enabled(&'static str),
    Disabled(&'static str),
}

impl std::fmt::Display for FrontendDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrontendDecision::Enabled(name) => write!(f, "{name} (enabled)"),
            FrontendDecision::Disabled(name) => write!(f, "{name} (fallback)"),
        }
    }
}

/// Resolves the frontend decision against a [`PackageHost`].
pub struct FrontendResolver<'a> {
    host: &'a dyn PackageHost,
}

impl<'a> FrontendResolver<'a> {
    pub fn new(host: &'a dyn PackageHost) -> Self {
        Self { host }
    }

    /// Resolve the policy into a decision, installing or removing packages
    /// as the policy dictates. Invoked exactly once per boot; side effects
    /// are not rolled back.
    pub fn resolve(
        &self,
        policy: FrontendPolicy,
        resource_dir: &Path,
    ) -> Result<FrontendDecision, BootError> {
        match policy {
            FrontendPolicy::Disabled => {
                for package in BACKEND_PACKAGES.iter().rev() {
                    best_effort(&format!("{package} uninstall"), self.host.uninstall(package));
                }
                Ok(FrontendDecision::Disabled(FALLBACK))
            }
            FrontendPolicy::Enabled => {
                if !self.install_local(resource_dir) {
                    info!("no usable local {BACKEND} package, falling back to the package index");
                    self.host
                        .install_index(&BACKEND_PACKAGES)
                        .map_err(BootError::FrontendInstallFailed)?;
                }
                if !self.host.import_ok(BACKEND) {
                    return Err(BootError::FrontendVerifyFailed);
                }
                Ok(FrontendDecision::Enabled(BACKEND))
            }
            FrontendPolicy::Auto { install_local } => {
                if install_local {
                    self.install_local(resource_dir);
                }
                if self.host.import_ok(BACKEND) {
                    Ok(FrontendDecision::Enabled(BACKEND))
                } else {
                    Ok(FrontendDecision::Disabled(FALLBACK))
                }
            }
        }
    }

    /// Install the backend from wheels under `resource_dir`.
    ///
    /// Unpacks the auxiliary resource archive if present, then installs
    /// every backend wheel in dependency order, each attempt independent
    /// and best-effort. Returns whether the main package installed.
    fn install_local(&self, resource_dir: &Path) -> bool {
        let archive = resource_dir.join(RESOURCE_ARCHIVE);
        if archive.is_file() {
            best_effort(
                "resource archive unpack",
                unpack_archive(&archive, resource_dir),
            );
        }

        let wheels = find_wheels(resource_dir);
        if wheels.is_empty() {
            info!("no {BACKEND} wheel under {} (skip)", resource_dir.display());
            return false;
        }

        let mut main_installed = false;
        for wheel in &wheels {
            let installed =
                best_effort("wheel install", self.host.install_wheel(wheel)).is_some();
            if installed && is_main_wheel(wheel) {
                main_installed = true;
            }
        }
        main_installed
    }
}

/// Collect backend wheels under `dir`, dependency wheels ordered before the
/// main package.
fn find_wheels(dir: &Path) -> Vec<PathBuf> {
    let mut wheels = Vec::new();
    collect_wheels(dir, &mut wheels);
    wheels.sort_by_key(|wheel| usize::from(is_main_wheel(wheel)));
    wheels
}

fn collect_wheels(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_wheels(&path, out);
        } else if is_backend_wheel(&path) {
            out.push(path);
        }
    }
}

fn is_backend_wheel(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "whl")
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(BACKEND))
}

fn is_main_wheel(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(BACKEND) && !name.starts_with("ttsfrd_dependency"))
}

/// Extract a zip archive next to itself.
fn unpack_archive(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    debug!("unpacking {}", archive.display());
    let file = std::fs::File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read {} as a zip archive", archive.display()))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(rel) = entry.enclosed_name() else {
            anyhow::bail!("Archive contains an unsafe path: {}", entry.name());
        };
        let out_path = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {}", out_path.display()))?;
    }
    Ok(())
}

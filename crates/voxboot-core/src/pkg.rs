//! Python package host: the install/uninstall/import seam the capability
//! resolver drives.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use tracing::debug;

/// Package operations on the interpreter that will run the inference
/// server. Every method is a blocking call into an external tool.
pub trait PackageHost {
    fn install_wheel(&self, wheel: &Path) -> anyhow::Result<()>;
    fn install_index(&self, packages: &[&str]) -> anyhow::Result<()>;
    fn uninstall(&self, package: &str) -> anyhow::Result<()>;
    /// Whether `import <module>` succeeds in the host interpreter.
    fn import_ok(&self, module: &str) -> bool;
}

/// Production host shelling out to `<python> -m pip`.
#[derive(Debug)]
pub struct PipHost {
    python: PathBuf,
}

impl PipHost {
    pub fn new(python: PathBuf) -> Self {
        Self { python }
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<()> {
        debug!("{} {}", self.python.display(), args.join(" "));
        let output = Command::new(&self.python)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", self.python.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} {:?} failed: {}",
                self.python.display(),
                args,
                stderr.trim()
            );
        }
        Ok(())
    }
}

impl PackageHost for PipHost {
    fn install_wheel(&self, wheel: &Path) -> anyhow::Result<()> {
        let wheel = wheel
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid wheel path: {}", wheel.display()))?;
        self.run(&["-m", "pip", "install", "--no-cache-dir", wheel])
    }

    fn install_index(&self, packages: &[&str]) -> anyhow::Result<()> {
        let mut args = vec!["-m", "pip", "install", "--no-cache-dir"];
        args.extend_from_slice(packages);
        self.run(&args)
    }

    fn uninstall(&self, package: &str) -> anyhow::Result<()> {
        self.run(&["-m", "pip", "uninstall", "-y", package])
    }

    fn import_ok(&self, module: &str) -> bool {
        Command::new(&self.python)
            .args(["-c", &format!("import {module}")])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

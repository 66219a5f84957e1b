//! Shallow-clone provider backed by the registry's git mirror.

use std::path::Path;
use std::process::Command;

use anyhow::Context;
use tracing::{debug, warn};
use url::Url;

use super::{Provider, ProviderKind};
use crate::store::{self, ArtifactStatus};

/// Fetches artifacts by cloning `<registry>/<identifier>.git` at depth 1.
#[derive(Debug)]
pub struct GitProvider {
    base: Url,
}

impl GitProvider {
    /// Create a new GitProvider rooted at the registry base URL.
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn clone_url(&self, identifier: &str) -> String {
        format!(
            "{}/{}.git",
            self.base.as_str().trim_end_matches('/'),
            identifier
        )
    }

    /// Initialize the large-file extension so weight files resolve to real
    /// content instead of pointer stubs. Best-effort: the clone is attempted
    /// either way.
    fn ensure_lfs(&self) {
        if run_git(&["lfs", "install", "--system"]).is_ok() {
            return;
        }
        if let Err(err) = run_git(&["lfs", "install"]) {
            warn!("git lfs unavailable, clone may yield pointer files: {err:#}");
        }
    }
}

impl Provider for GitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Git
    }

    fn fetch(&self, identifier: &str, target: &Path) -> anyhow::Result<()> {
        self.ensure_lfs();

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory: {}", parent.display())
            })?;
        }

        // `git clone` refuses a pre-existing destination, even an empty one
        if target.exists() && store::probe(target) == ArtifactStatus::Absent {
            std::fs::remove_dir_all(target).with_context(|| {
                format!("Failed to clear empty target directory: {}", target.display())
            })?;
        }

        let url = self.clone_url(identifier);
        let dest = target
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid target path: {}", target.display()))?;
        run_git(&["clone", "--depth", "1", &url, dest])
    }
}

/// Run a git command.
fn run_git(args: &[&str]) -> anyhow::Result<()> {
    debug!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run git {:?}", args))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Git command failed {:?}: {}", args, stderr.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_clone_url_from_identifier() {
        let provider = GitProvider::new(Url::parse("https://www.modelscope.cn").unwrap());
        assert_eq!(
            provider.clone_url("iic/CosyVoice2-0.5B"),
            "https://www.modelscope.cn/iic/CosyVoice2-0.5B.git"
        );
    }

    #[test]
    fn clone_url_keeps_registry_path_segments() {
        let provider = GitProvider::new(Url::parse("https://mirror.example.com/hub/").unwrap());
        assert_eq!(
            provider.clone_url("iic/CosyVoice-ttsfrd"),
            "https://mirror.example.com/hub/iic/CosyVoice-ttsfrd.git"
        );
    }
}

//! Snapshot-download provider backed by the registry's HTTP API.
//!
//! A snapshot is the registry's file manifest for an identifier plus the
//! raw content of every listed file. Downloads are driven to completion on
//! a private runtime; nothing outside this module is async.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{Provider, ProviderKind};

const USER_AGENT: &str = "voxboot/0.1.0";

/// File listing returned by the registry's manifest endpoint.
#[derive(Debug, Deserialize)]
struct FileManifest {
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    path: String,
    #[serde(default)]
    size: u64,
}

/// Fetches artifacts file-by-file through the registry's snapshot API.
#[derive(Debug)]
pub struct RegistryProvider {
    base: Url,
}

impl RegistryProvider {
    /// Create a new RegistryProvider rooted at the registry base URL.
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn manifest_url(&self, identifier: &str) -> String {
        format!(
            "{}/api/v1/models/{}/repo/files",
            self.base.as_str().trim_end_matches('/'),
            identifier
        )
    }

    fn blob_url(&self, identifier: &str, path: &str) -> String {
        format!(
            "{}/models/{}/resolve/master/{}",
            self.base.as_str().trim_end_matches('/'),
            identifier,
            path
        )
    }

    async fn snapshot(&self, identifier: &str, target: &Path) -> anyhow::Result<()> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let manifest_url = self.manifest_url(identifier);
        let response = client
            .get(&manifest_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch file manifest from {}", manifest_url))?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch file manifest: HTTP {} from {}",
                response.status(),
                manifest_url
            );
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read manifest body from {}", manifest_url))?;
        let manifest: FileManifest = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse file manifest for {}", identifier))?;

        if manifest.files.is_empty() {
            anyhow::bail!("Registry returned an empty file list for {}", identifier);
        }

        for entry in &manifest.files {
            let rel = sanitize(&entry.path)?;
            let dest = target.join(rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }

            let blob_url = self.blob_url(identifier, &entry.path);
            let response = client
                .get(&blob_url)
                .send()
                .await
                .with_context(|| format!("Failed to download {}", blob_url))?;
            if !response.status().is_success() {
                anyhow::bail!(
                    "Failed to download {}: HTTP {} from {}",
                    entry.path,
                    response.status(),
                    blob_url
                );
            }
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body from {}", blob_url))?;
            std::fs::write(&dest, &bytes)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            debug!("fetched {} ({} bytes declared)", entry.path, entry.size);
        }

        Ok(())
    }
}

impl Provider for RegistryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Registry
    }

    fn fetch(&self, identifier: &str, target: &Path) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        runtime.block_on(self.snapshot(identifier, target))
    }
}

/// Reject manifest paths that would escape the target directory.
fn sanitize(path: &str) -> anyhow::Result<PathBuf> {
    let rel = Path::new(path);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        anyhow::bail!("Registry manifest contains an unsafe path: {}", path);
    }
    Ok(rel.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_manifest() {
        let manifest: FileManifest = serde_json::from_str(
            r#"{"files":[{"path":"model.onnx","size":42},{"path":"config.yaml"}]}"#,
        )
        .unwrap();

        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].path, "model.onnx");
        assert_eq!(manifest.files[0].size, 42);
        assert_eq!(manifest.files[1].size, 0);
    }

    #[test]
    fn builds_snapshot_urls() {
        let provider = RegistryProvider::new(Url::parse("https://www.modelscope.cn").unwrap());
        assert_eq!(
            provider.manifest_url("iic/CosyVoice2-0.5B"),
            "https://www.modelscope.cn/api/v1/models/iic/CosyVoice2-0.5B/repo/files"
        );
        assert_eq!(
            provider.blob_url("iic/CosyVoice2-0.5B", "cosyvoice.yaml"),
            "https://www.modelscope.cn/models/iic/CosyVoice2-0.5B/resolve/master/cosyvoice.yaml"
        );
    }

    #[test]
    fn rejects_escaping_manifest_paths() {
        assert!(sanitize("../../etc/passwd").is_err());
        assert!(sanitize("/etc/passwd").is_err());
        assert!(sanitize("llm/weights.safetensors").is_ok());
    }
}

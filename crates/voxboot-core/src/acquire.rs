//! Artifact acquisition: probe the store, then try providers in policy
//! order with at most one fallback hop.

use std::path::Path;

use tracing::{info, warn};

use crate::provider::{Provider, ProviderKind};
use crate::store::{self, ArtifactStatus};

/// Which providers to try, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquirePolicy {
    /// Shallow git clone only.
    Git,
    /// Registry snapshot download only.
    Registry,
    /// Git first, registry as the single fallback.
    Auto,
}

/// Result of one acquisition attempt.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    /// Target already populated; no provider was invoked.
    Present,
    /// A provider populated the target.
    Acquired(ProviderKind),
    /// Every applicable provider was exhausted.
    Failed(anyhow::Error),
}

/// Orchestrates the store probe and the ordered providers.
pub struct Acquirer<'a> {
    git: &'a dyn Provider,
    registry: &'a dyn Provider,
}

impl<'a> Acquirer<'a> {
    pub fn new(git: &'a dyn Provider, registry: &'a dyn Provider) -> Self {
        Self { git, registry }
    }

    /// Fetch `identifier` into `target` unless the target is already
    /// populated.
    ///
    /// The Present short-circuit is the idempotency contract: a populated
    /// target means no network activity at all. Under [`AcquirePolicy::Auto`]
    /// a git failure is followed by exactly one registry attempt, whose
    /// error becomes the final failure.
    pub fn acquire(
        &self,
        identifier: &str,
        target: &Path,
        policy: AcquirePolicy,
    ) -> AcquisitionOutcome {
        if store::probe(target) == ArtifactStatus::Present {
            info!("found: {} (skip)", target.display());
            return AcquisitionOutcome::Present;
        }

        info!("downloading {} -> {}", identifier, target.display());
        match policy {
            AcquirePolicy::Git => self.try_one(self.git, identifier, target),
            AcquirePolicy::Registry => self.try_one(self.registry, identifier, target),
            AcquirePolicy::Auto => match self.git.fetch(identifier, target) {
                Ok(()) => AcquisitionOutcome::Acquired(self.git.kind()),
                Err(err) => {
                    warn!("git fetch failed ({err:#}), trying registry snapshot");
                    self.try_one(self.registry, identifier, target)
                }
            },
        }
    }

    fn try_one(
        &self,
        provider: &dyn Provider,
        identifier: &str,
        target: &Path,
    ) -> AcquisitionOutcome {
        match provider.fetch(identifier, target) {
            Ok(()) => AcquisitionOutcome::Acquired(provider.kind()),
            Err(err) => AcquisitionOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    use super::*;

    struct ScriptedProvider {
        kind: ProviderKind,
        succeed: bool,
        calls: Cell<usize>,
    }

    impl ScriptedProvider {
        fn new(kind: ProviderKind, succeed: bool) -> Self {
            Self {
                kind,
                succeed,
                calls: Cell::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.get()
        }
    }

    impl Provider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn fetch(&self, _identifier: &str, target: &Path) -> anyhow::Result<()> {
            self.calls.set(self.calls.get() + 1);
            if !self.succeed {
                anyhow::bail!("connection refused");
            }
            fs::create_dir_all(target)?;
            fs::write(target.join("weights.bin"), b"w")?;
            Ok(())
        }
    }

    #[test]
    fn present_target_skips_all_providers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("weights.bin"), b"w").unwrap();
        let git = ScriptedProvider::new(ProviderKind::Git, true);
        let registry = ScriptedProvider::new(ProviderKind::Registry, true);
        let acquirer = Acquirer::new(&git, &registry);

        let outcome = acquirer.acquire("iic/model", dir.path(), AcquirePolicy::Auto);

        assert!(matches!(outcome, AcquisitionOutcome::Present));
        assert_eq!(git.calls(), 0);
        assert_eq!(registry.calls(), 0);
    }

    #[test]
    fn second_acquire_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("model");
        let git = ScriptedProvider::new(ProviderKind::Git, true);
        let registry = ScriptedProvider::new(ProviderKind::Registry, true);
        let acquirer = Acquirer::new(&git, &registry);

        let first = acquirer.acquire("iic/model", &target, AcquirePolicy::Git);
        let second = acquirer.acquire("iic/model", &target, AcquirePolicy::Git);

        assert!(matches!(first, AcquisitionOutcome::Acquired(ProviderKind::Git)));
        assert!(matches!(second, AcquisitionOutcome::Present));
        assert_eq!(git.calls(), 1);
    }

    #[test]
    fn auto_falls_back_to_registry_on_git_failure() {
        // Target exists but is empty, which counts as absent.
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("models").join("X");
        fs::create_dir_all(&target).unwrap();
        let git = ScriptedProvider::new(ProviderKind::Git, false);
        let registry = ScriptedProvider::new(ProviderKind::Registry, true);
        let acquirer = Acquirer::new(&git, &registry);

        let outcome = acquirer.acquire("iic/model", &target, AcquirePolicy::Auto);

        assert!(matches!(
            outcome,
            AcquisitionOutcome::Acquired(ProviderKind::Registry)
        ));
        assert_eq!(git.calls(), 1);
        assert_eq!(registry.calls(), 1);
        assert_eq!(store::probe(&target), ArtifactStatus::Present);
    }

    #[test]
    fn auto_makes_exactly_one_fallback_hop() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("model");
        let git = ScriptedProvider::new(ProviderKind::Git, false);
        let registry = ScriptedProvider::new(ProviderKind::Registry, false);
        let acquirer = Acquirer::new(&git, &registry);

        let outcome = acquirer.acquire("iic/model", &target, AcquirePolicy::Auto);

        assert!(matches!(outcome, AcquisitionOutcome::Failed(_)));
        assert_eq!(git.calls(), 1);
        assert_eq!(registry.calls(), 1);
    }

    #[test]
    fn git_policy_never_touches_the_registry() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("model");
        let git = ScriptedProvider::new(ProviderKind::Git, false);
        let registry = ScriptedProvider::new(ProviderKind::Registry, true);
        let acquirer = Acquirer::new(&git, &registry);

        let outcome = acquirer.acquire("iic/model", &target, AcquirePolicy::Git);

        assert!(matches!(outcome, AcquisitionOutcome::Failed(_)));
        assert_eq!(registry.calls(), 0);
    }

    #[test]
    fn registry_policy_never_touches_git() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("model");
        let git = ScriptedProvider::new(ProviderKind::Git, true);
        let registry = ScriptedProvider::new(ProviderKind::Registry, true);
        let acquirer = Acquirer::new(&git, &registry);

        let outcome = acquirer.acquire("iic/model", &target, AcquirePolicy::Registry);

        assert!(matches!(
            outcome,
            AcquisitionOutcome::Acquired(ProviderKind::Registry)
        ));
        assert_eq!(git.calls(), 0);
    }
}

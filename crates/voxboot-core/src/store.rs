//! Artifact store probe.

use std::path::Path;

/// Result of probing an artifact target location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// The path exists and holds at least one entry.
    Present,
    /// The path is missing, empty, or unreadable.
    Absent,
}

/// Check whether a target location already holds usable content.
///
/// "Usable" is a binary exists-and-non-empty test, not content validation;
/// a prior interrupted fetch that left files behind reads as Present. This
/// is the sole idempotency gate for acquisition.
pub fn probe(path: &Path) -> ArtifactStatus {
    let Ok(mut entries) = std::fs::read_dir(path) else {
        return ArtifactStatus::Absent;
    };
    if entries.next().is_some() {
        ArtifactStatus::Present
    } else {
        ArtifactStatus::Absent
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn missing_path_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(probe(&dir.path().join("nope")), ArtifactStatus::Absent);
    }

    #[test]
    fn empty_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(probe(dir.path()), ArtifactStatus::Absent);
    }

    #[test]
    fn directory_with_a_file_is_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("weights.bin"), b"w").unwrap();
        assert_eq!(probe(dir.path()), ArtifactStatus::Present);
    }

    #[test]
    fn directory_with_a_subdirectory_is_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("shards")).unwrap();
        assert_eq!(probe(dir.path()), ArtifactStatus::Present);
    }
}

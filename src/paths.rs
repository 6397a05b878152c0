//! Path normalization and artifact path layout.
//!
//! Pure, total functions shared by every layer that touches a repository
//! path. The storage backends and the virtual filesystem both speak
//! normalized relative paths ("requirements/REQ-1.md"), never absolute ones.

use std::path::PathBuf;

/// Directory the embedded engine keeps its metadata in.
pub const INTERNAL_DIR: &str = ".git";

/// Reserved folder for the on-disk commit-file cache document.
pub const RESERVED_DIR: &str = ".reqtrace";

/// Reserved folder holding one ID-counter file per artifact type.
pub const COUNTER_DIR: &str = "counters";

/// Artifact types the project layout knows about. Each owns one folder
/// and one ID-counter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Requirement,
    UseCase,
    TestCase,
    Information,
}

impl ArtifactKind {
    /// All artifact kinds, in folder-layout order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Requirement,
        ArtifactKind::UseCase,
        ArtifactKind::TestCase,
        ArtifactKind::Information,
    ];

    /// Folder this artifact type is stored under.
    pub fn folder(&self) -> &'static str {
        match self {
            ArtifactKind::Requirement => "requirements",
            ArtifactKind::UseCase => "usecases",
            ArtifactKind::TestCase => "testcases",
            ArtifactKind::Information => "information",
        }
    }

    /// Path of the ID-counter file for this artifact type.
    pub fn counter_path(&self) -> String {
        format!("{}/{}.txt", COUNTER_DIR, self.folder())
    }

    /// Resolve an artifact kind from its folder name.
    pub fn from_folder(folder: &str) -> Option<ArtifactKind> {
        ArtifactKind::ALL.iter().copied().find(|k| k.folder() == folder)
    }
}

/// Deterministic artifact file path: `<folder>/<id>.md`.
pub fn artifact_path(kind: ArtifactKind, id: &str) -> String {
    format!("{}/{}.md", kind.folder(), id)
}

/// Canonicalize a repository-relative path: strip any number of leading
/// slashes and a single leading `./`.
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    trimmed.to_string()
}

/// True iff the path is inside the engine's internal metadata directory.
pub fn is_internal_path(path: &str) -> bool {
    let normalized = normalize(path);
    normalized == INTERNAL_DIR || normalized.starts_with(&format!("{INTERNAL_DIR}/"))
}

/// Remove editor swap files, autosaves, generic temp files, trailing-tilde
/// backups and dot-hash lock files from a directory listing. Applied only
/// to user-visible directories, never to internal metadata.
pub fn filter_transient(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| !is_transient(name))
        .collect()
}

/// Like [`filter_transient`], but for a full repository-relative path:
/// only the final component is inspected.
pub fn is_transient_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    is_transient(name)
}

fn is_transient(name: &str) -> bool {
    name.ends_with(".swp")
        || name.ends_with(".swo")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
        || name.ends_with(".temp")
        || name.ends_with(".autosave")
        || name.ends_with('~')
        || name.starts_with(".#")
}

/// Synthesize the "no such file" error the engine and callers recognize.
pub fn not_found(path: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("ENOENT: no such file or directory, '{path}'"),
    )
}

/// Join a normalized repository path onto a host root directory.
pub fn join_root(root: &std::path::Path, path: &str) -> PathBuf {
    let mut joined = root.to_path_buf();
    for part in normalize(path).split('/').filter(|p| !p.is_empty()) {
        joined.push(part);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_leading_slashes() {
        assert_eq!(normalize("/requirements/REQ-1.md"), "requirements/REQ-1.md");
        assert_eq!(normalize("///a/b"), "a/b");
        assert_eq!(normalize("a/b"), "a/b");
    }

    #[test]
    fn test_normalize_strips_single_dot_slash() {
        assert_eq!(normalize("./a/b"), "a/b");
        // Only one leading "./" is stripped
        assert_eq!(normalize("././a"), "./a");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn test_is_internal_path() {
        assert!(is_internal_path(".git"));
        assert!(is_internal_path("/.git"));
        assert!(is_internal_path(".git/HEAD"));
        assert!(is_internal_path("/.git/objects/ab/cdef"));
        assert!(!is_internal_path(".gitignore"));
        assert!(!is_internal_path("requirements/REQ-1.md"));
    }

    #[test]
    fn test_filter_transient() {
        let names = vec![
            "REQ-1.md".to_string(),
            ".REQ-1.md.swp".to_string(),
            "draft.tmp".to_string(),
            "notes.md~".to_string(),
            ".#lock".to_string(),
            "UC-2.md".to_string(),
            "save.autosave".to_string(),
        ];
        assert_eq!(filter_transient(names), vec!["REQ-1.md", "UC-2.md"]);
    }

    #[test]
    fn test_is_transient_path_inspects_last_component() {
        assert!(is_transient_path("requirements/.REQ-1.md.swp"));
        assert!(is_transient_path("usecases/UC-3.md~"));
        assert!(is_transient_path(".#lock"));
        assert!(!is_transient_path("requirements/REQ-1.md"));
        // Directory components never trip the check.
        assert!(!is_transient_path("drafts.tmp/REQ-2.md"));
    }

    #[test]
    fn test_artifact_path_layout() {
        assert_eq!(
            artifact_path(ArtifactKind::Requirement, "REQ-1"),
            "requirements/REQ-1.md"
        );
        assert_eq!(
            artifact_path(ArtifactKind::TestCase, "TC-42"),
            "testcases/TC-42.md"
        );
    }

    #[test]
    fn test_counter_paths_are_distinct() {
        let mut paths: Vec<String> = ArtifactKind::ALL.iter().map(|k| k.counter_path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn test_from_folder_round_trip() {
        for kind in ArtifactKind::ALL {
            assert_eq!(ArtifactKind::from_folder(kind.folder()), Some(kind));
        }
        assert_eq!(ArtifactKind::from_folder("unknown"), None);
    }

    #[test]
    fn test_not_found_kind() {
        let err = not_found("a/b.md");
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("a/b.md"));
    }
}

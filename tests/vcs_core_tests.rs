use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use reqtrace_vcs::engine::FileState;
use reqtrace_vcs::error::VcsError;
use reqtrace_vcs::paths::ArtifactKind;
use reqtrace_vcs::ArtifactVcs;

/// Create an initialized project in a fresh temp directory.
fn init_vcs() -> (TempDir, ArtifactVcs) {
    let temp = TempDir::new().unwrap();
    let vcs = ArtifactVcs::with_native_store(temp.path());
    vcs.init().unwrap();
    (temp, vcs)
}

#[test]
fn init_creates_artifact_folders_and_repository() {
    let (temp, _vcs) = init_vcs();

    for kind in ArtifactKind::ALL {
        assert!(temp.path().join(kind.folder()).is_dir());
    }
    assert!(temp.path().join(".git").is_dir());
    assert!(temp.path().join(".git/HEAD").is_file());
}

#[test]
fn init_is_idempotent() {
    let (temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "shall do things")
        .unwrap();
    vcs.commit_file(&path, "Add REQ-1", None).unwrap();

    // A second init must not disturb the repository or its history.
    vcs.init().unwrap();
    assert_eq!(vcs.get_history(None, 0, "HEAD").unwrap().len(), 1);
    assert!(temp.path().join("requirements/REQ-1.md").is_file());
}

#[test]
fn operations_fail_before_init() {
    let temp = TempDir::new().unwrap();
    let vcs = ArtifactVcs::with_native_store(temp.path());

    let err = vcs.get_status().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VcsError>(),
        Some(VcsError::NotInitialized)
    ));

    let err = vcs.commit_file("requirements/REQ-1.md", "msg", None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VcsError>(),
        Some(VcsError::NotInitialized)
    ));
}

#[test]
fn init_repairs_corrupt_head() {
    let (temp, vcs) = init_vcs();
    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "v1")
        .unwrap();
    vcs.commit_file(&path, "Add REQ-1", None).unwrap();
    drop(vcs);

    fs::write(temp.path().join(".git/HEAD"), "garbage\n").unwrap();

    let vcs = ArtifactVcs::with_native_store(temp.path());
    vcs.init().unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join(".git/HEAD")).unwrap(),
        "ref: refs/heads/main\n"
    );
    // History written before the corruption is still reachable.
    assert_eq!(vcs.get_history(None, 0, "HEAD").unwrap().len(), 1);
}

#[test]
fn commit_stores_file_and_returns_hash() {
    let (_temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "the system shall")
        .unwrap();
    assert_eq!(path, "requirements/REQ-1.md");

    let hash = vcs.commit_file(&path, "Add REQ-1", None).unwrap();
    assert_eq!(hash.len(), 40);

    let history = vcs.get_history(None, 0, "HEAD").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].hash, hash);
    assert_eq!(history[0].message, "Add REQ-1");
    assert_eq!(history[0].author_name, "ReqTrace User");
}

#[test]
fn commit_of_absent_path_records_deletion() {
    let (temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::UseCase, "UC-1", "actor does a thing")
        .unwrap();
    vcs.commit_file(&path, "Add UC-1", None).unwrap();

    // Delete on disk, then commit the same path: staging is driven by
    // what exists in storage, so this becomes a removal commit.
    fs::remove_file(temp.path().join(&path)).unwrap();
    let hash = vcs.commit_file(&path, "Remove UC-1", None).unwrap();

    let files = vcs.list_files_at_commit(&hash).unwrap();
    assert!(!files.contains(&path));
    assert_eq!(vcs.get_history(None, 0, "HEAD").unwrap().len(), 2);
}

#[test]
fn concurrent_commits_all_succeed() {
    let (temp, vcs) = init_vcs();
    let vcs = Arc::new(vcs);

    let mut handles = Vec::new();
    for i in 0..8 {
        let vcs = Arc::clone(&vcs);
        let root = temp.path().to_path_buf();
        handles.push(thread::spawn(move || {
            let path = format!("requirements/REQ-{i}.md");
            fs::write(root.join(&path), format!("requirement {i}")).unwrap();
            vcs.commit_file(&path, &format!("Add REQ-{i}"), None).unwrap()
        }));
    }

    let mut hashes: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    hashes.sort();
    hashes.dedup();
    assert_eq!(hashes.len(), 8, "every commit produced a distinct hash");
    assert_eq!(vcs.get_history(None, 0, "HEAD").unwrap().len(), 8);
}

#[test]
fn concurrent_commits_land_in_issue_order() {
    let (temp, vcs) = init_vcs();
    let seed = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-0", "seed")
        .unwrap();
    vcs.commit_file(&seed, "Add REQ-0", None).unwrap();

    let vcs = Arc::new(vcs);
    let mut handles = Vec::new();
    for i in 1..=6usize {
        let vcs = Arc::clone(&vcs);
        let root = temp.path().to_path_buf();
        handles.push(thread::spawn(move || {
            let path = format!("requirements/REQ-{i}.md");
            fs::write(root.join(&path), format!("requirement {i}")).unwrap();
            // Take turn i: issue only after every earlier commit landed,
            // so the issue order is known exactly.
            while vcs.get_history(None, 0, "HEAD").unwrap().len() != i {
                thread::yield_now();
            }
            vcs.commit_file(&path, &format!("Add REQ-{i}"), None).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let messages: Vec<String> = vcs
        .get_history(None, 0, "HEAD")
        .unwrap()
        .into_iter()
        .map(|c| c.message)
        .collect();
    let expected: Vec<String> = (0..=6).rev().map(|i| format!("Add REQ-{i}")).collect();
    assert_eq!(messages, expected);
}

#[test]
fn status_reports_unindexed_files_as_new() {
    let (temp, vcs) = init_vcs();

    fs::write(temp.path().join("requirements/REQ-9.md"), "draft").unwrap();
    // Editor droppings never show up.
    fs::write(temp.path().join("requirements/.REQ-9.md.swp"), "x").unwrap();

    let entries = vcs.get_status().unwrap();
    let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"requirements/REQ-9.md"));
    assert!(!paths.iter().any(|p| p.ends_with(".swp")));

    let entry = entries
        .iter()
        .find(|e| e.path == "requirements/REQ-9.md")
        .unwrap();
    assert_eq!(entry.state, FileState::New);
}

#[test]
fn status_suppresses_recently_committed_paths() {
    let (temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "v1")
        .unwrap();
    vcs.commit_file(&path, "Add REQ-1", None).unwrap();

    // A write landing right after the commit stays invisible while the
    // grace window is open, so callers never see a half-settled state.
    fs::write(temp.path().join(&path), "v2").unwrap();
    let entries = vcs.get_status().unwrap();
    assert!(!entries.iter().any(|e| e.path == path));
}

#[test]
fn status_is_served_from_cache_within_ttl() {
    let (temp, vcs) = init_vcs();

    let first = vcs.get_status().unwrap();
    assert!(first.is_empty());

    fs::write(temp.path().join("requirements/REQ-2.md"), "draft").unwrap();

    // Within the TTL the cached (empty) result is returned as-is.
    let cached = vcs.get_status().unwrap();
    assert!(cached.is_empty());

    thread::sleep(Duration::from_millis(350));
    let fresh = vcs.get_status().unwrap();
    assert!(fresh.iter().any(|e| e.path == "requirements/REQ-2.md"));
}

#[test]
fn revert_restores_committed_content() {
    let (temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "original")
        .unwrap();
    vcs.commit_file(&path, "Add REQ-1", None).unwrap();

    fs::write(temp.path().join(&path), "scribbles").unwrap();
    vcs.revert_file(&path).unwrap();

    assert_eq!(
        fs::read_to_string(temp.path().join(&path)).unwrap(),
        "original"
    );
}

#[test]
fn revert_deletes_untracked_file() {
    let (temp, vcs) = init_vcs();

    fs::write(temp.path().join("requirements/REQ-3.md"), "never committed").unwrap();
    vcs.revert_file("requirements/REQ-3.md").unwrap();
    assert!(!temp.path().join("requirements/REQ-3.md").exists());
}

#[test]
fn revert_of_unknown_path_is_a_no_op() {
    let (_temp, vcs) = init_vcs();
    vcs.revert_file("requirements/REQ-404.md").unwrap();
}

#[test]
fn rename_produces_a_single_commit() {
    let (temp, vcs) = init_vcs();

    let old = vcs
        .save_artifact(ArtifactKind::TestCase, "TC-1", "step one")
        .unwrap();
    vcs.commit_file(&old, "Add TC-1", None).unwrap();

    let hash = vcs
        .rename_file(&old, "testcases/TC-100.md", "step one", None)
        .unwrap();

    assert!(!temp.path().join(&old).exists());
    assert_eq!(
        fs::read_to_string(temp.path().join("testcases/TC-100.md")).unwrap(),
        "step one"
    );

    let history = vcs.get_history(None, 0, "HEAD").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].hash, hash);
    assert_eq!(
        history[0].message,
        "Rename testcases/TC-1.md to testcases/TC-100.md"
    );

    let changed = vcs.get_commit_files(&hash).unwrap();
    assert!(changed.contains(&old));
    assert!(changed.contains(&"testcases/TC-100.md".to_string()));
}

#[test]
fn rename_of_never_committed_file_still_works() {
    let (temp, vcs) = init_vcs();

    fs::write(temp.path().join("requirements/REQ-7.md"), "draft").unwrap();
    vcs.rename_file(
        "requirements/REQ-7.md",
        "requirements/REQ-8.md",
        "draft",
        Some("Renumber"),
    )
    .unwrap();

    assert!(!temp.path().join("requirements/REQ-7.md").exists());
    assert!(temp.path().join("requirements/REQ-8.md").is_file());
}

#[test]
fn commit_reattaches_detached_head() {
    let (temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "v1")
        .unwrap();
    let first = vcs.commit_file(&path, "Add REQ-1", None).unwrap();
    drop(vcs);

    // Detach HEAD behind the library's back.
    let repo = git2::Repository::open(temp.path()).unwrap();
    repo.set_head_detached(git2::Oid::from_str(&first).unwrap())
        .unwrap();
    drop(repo);

    let vcs = ArtifactVcs::with_native_store(temp.path());
    vcs.init().unwrap();
    fs::write(temp.path().join(&path), "v2").unwrap();
    let second = vcs.commit_file(&path, "Update REQ-1", None).unwrap();

    // The new commit advanced the branch rather than floating detached.
    let repo = git2::Repository::open(temp.path()).unwrap();
    assert!(!repo.head_detached().unwrap());
    assert_eq!(
        repo.find_branch("main", git2::BranchType::Local)
            .unwrap()
            .get()
            .target()
            .unwrap()
            .to_string(),
        second
    );
}

#[test]
fn delete_artifact_removes_file() {
    let (temp, vcs) = init_vcs();

    let path = vcs
        .save_artifact(ArtifactKind::Information, "INFO-1", "context")
        .unwrap();
    assert!(temp.path().join(&path).is_file());

    vcs.delete_artifact(ArtifactKind::Information, "INFO-1").unwrap();
    assert!(!temp.path().join(&path).exists());
}

#[test]
fn sandbox_store_backs_the_same_workflow() {
    let temp = TempDir::new().unwrap();
    let vcs = ArtifactVcs::with_sandbox_store(temp.path());
    vcs.init().unwrap();

    let path = vcs
        .save_artifact(ArtifactKind::Requirement, "REQ-1", "sandboxed")
        .unwrap();
    let hash = vcs.commit_file(&path, "Add REQ-1", None).unwrap();
    assert_eq!(
        vcs.read_file_at_commit(&path, &hash).unwrap().as_deref(),
        Some("sandboxed")
    );
}

//! Removal of branches, tags and individual saves.
//!
//! Removing a save re-parents the saves that came after it, so the rest of
//! the branch keeps its history. Nothing is deleted from the store here;
//! the space is reclaimed by the next garbage collection.
//!
//! Entry point: [`run_rm`].

pub mod config;
pub mod error;
pub mod history;
pub mod name;
pub mod remove;

pub use config::RmConfig;
pub use error::{RemovalError, RmError, RmResult};
pub use history::{format_save_time, load_history, save_names, Save, SAVE_TIME_FORMAT};
pub use name::{parse_name, SaveSelector, Target, LATEST, TAG_DIR};
pub use remove::{remove, run_rm, NameOutcome, NameResult, Removal, RmReport};

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_refs::{Ref, RefStore};
    use hoard_repo::{ConfigError, LocalRepo, MemoryRepo, RepoHandle};
    use hoard_store::{EntryMode, ObjectKind, Snapshot, StoredObject, Tree, TreeEntry};
    use hoard_types::ObjectId;

    fn config() -> RmConfig {
        RmConfig {
            acknowledge_unsafe: true,
            ..RmConfig::default()
        }
    }

    /// Write a save of one file on top of `branch` and move the branch.
    fn save(repo: &mut dyn RepoHandle, branch: &str, timestamp: i64, content: &[u8]) -> ObjectId {
        let ref_name = format!("refs/heads/{branch}");
        let parent = repo.refs().read_ref(&ref_name).unwrap().map(|r| r.target());
        let blob = StoredObject::new(ObjectKind::Blob, content.to_vec());
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "file", blob.compute_id())])
            .to_stored_object()
            .unwrap();
        let snapshot = Snapshot {
            tree: tree.compute_id(),
            parent,
            timestamp,
            author: "tester".into(),
            message: format!("save at {timestamp}"),
        }
        .to_stored_object()
        .unwrap();
        let id = snapshot.compute_id();
        repo.write_objects(&[blob, tree, snapshot], 1).unwrap();
        repo.refs()
            .update_ref(&ref_name, &Ref::branch(branch, id), parent)
            .unwrap();
        id
    }

    fn snapshot(repo: &dyn RepoHandle, id: ObjectId) -> Snapshot {
        Snapshot::from_stored_object(&repo.read_object(&id).unwrap().unwrap()).unwrap()
    }

    fn tip(repo: &dyn RepoHandle, branch: &str) -> Option<ObjectId> {
        repo.refs()
            .read_ref(&format!("refs/heads/{branch}"))
            .unwrap()
            .map(|r| r.target())
    }

    fn names(list: &[&str]) -> Vec<Vec<u8>> {
        list.iter().map(|n| n.as_bytes().to_vec()).collect()
    }

    #[test]
    fn removing_a_middle_save_reparents_the_next() {
        let mut repo = MemoryRepo::new();
        let a = save(&mut repo, "home", 1_000, b"a");
        let b = save(&mut repo, "home", 2_000, b"b");
        let c = save(&mut repo, "home", 3_000, b"c");
        let objects_before = repo.objects.len();

        let target = format!("home/{}", format_save_time(2_000));
        let report = run_rm(&mut repo, &names(&[&target]), &config()).unwrap();

        assert!(report.tally.is_clean());
        assert_eq!(report.snapshots_written, 1);
        let new_tip = tip(&repo, "home").unwrap();
        assert_ne!(new_tip, c);
        let rewritten = snapshot(&repo, new_tip);
        assert_eq!(rewritten.parent, Some(a));
        assert_eq!(rewritten.with_parent(Some(b)), snapshot(&repo, c));
        // nothing is deleted; the old saves wait for collection
        assert_eq!(repo.objects.len(), objects_before + 1);
        assert!(repo.read_object(&b).unwrap().is_some());
    }

    #[test]
    fn removed_save_is_collected_and_ancestors_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepo::init(dir.path()).unwrap();
        let a = save(&mut repo, "home", 1_000, b"first");
        let b = save(&mut repo, "home", 2_000, b"second");
        save(&mut repo, "home", 3_000, b"third");

        let target = format!("home/{}", format_save_time(2_000));
        let report = run_rm(&mut repo, &names(&[&target]), &config()).unwrap();
        assert!(report.tally.is_clean());
        drop(repo);

        let gc_config = hoard_gc::GcConfig {
            acknowledge_unsafe: true,
            false_positive_rate: 1e-9,
            ..hoard_gc::GcConfig::default()
        };
        let gc = hoard_gc::run_gc(dir.path(), &gc_config).unwrap();
        assert!(gc.tally.is_clean());
        assert!(gc.objects_dropped >= 3);

        let repo = LocalRepo::open(dir.path()).unwrap();
        let new_tip = tip(&repo, "home").unwrap();
        assert_eq!(snapshot(&repo, new_tip).parent, Some(a));
        assert!(repo.read_object(&a).unwrap().is_some());
        assert!(repo.read_object(&b).unwrap().is_none());
        let second = StoredObject::new(ObjectKind::Blob, b"second".to_vec());
        assert!(repo.read_object(&second.compute_id()).unwrap().is_none());
    }

    #[test]
    fn missing_name_fails_alone() {
        let mut repo = MemoryRepo::new();
        save(&mut repo, "one", 1_000, b"1");
        save(&mut repo, "two", 1_000, b"2");

        let report = run_rm(&mut repo, &names(&["one", "missing", "two"]), &config()).unwrap();

        assert_eq!(report.tally.count(), 1);
        assert_eq!(report.removed(), 2);
        assert_eq!(report.outcomes[0].result.as_ref().ok(), Some(&Removal::Branch("one".into())));
        assert!(matches!(
            report.outcomes[1].result.as_ref().map_err(|e| &**e),
            Err(RemovalError::NotFound { name }) if name == "missing"
        ));
        assert_eq!(report.outcomes[2].result.as_ref().ok(), Some(&Removal::Branch("two".into())));
        assert!(repo.refs.branches().unwrap().is_empty());
    }

    #[test]
    fn tags_are_removed_by_tag_path() {
        let mut repo = MemoryRepo::new();
        let id = save(&mut repo, "home", 1_000, b"x");
        repo.refs
            .write_ref("refs/tags/v1", &Ref::tag("v1", id))
            .unwrap();

        let report = run_rm(&mut repo, &names(&["/.tag/v1"]), &config()).unwrap();
        assert_eq!(report.outcomes[0].result.as_ref().ok(), Some(&Removal::Tag("v1".into())));
        assert!(repo.refs.tags().unwrap().is_empty());
        assert_eq!(tip(&repo, "home"), Some(id));

        let again = run_rm(&mut repo, &names(&[".tag/v1"]), &config()).unwrap();
        assert_eq!(again.tally.count(), 1);
    }

    #[test]
    fn removing_latest_moves_the_branch_back() {
        let mut repo = MemoryRepo::new();
        let a = save(&mut repo, "home", 1_000, b"a");
        save(&mut repo, "home", 2_000, b"b");
        let batches = repo.batches_written;

        let report = run_rm(&mut repo, &names(&["home/latest"]), &config()).unwrap();
        assert!(report.tally.is_clean());
        assert_eq!(report.snapshots_written, 0);
        assert_eq!(repo.batches_written, batches);
        assert_eq!(tip(&repo, "home"), Some(a));
    }

    #[test]
    fn removing_every_save_deletes_the_branch() {
        let mut repo = MemoryRepo::new();
        save(&mut repo, "home", 1_000, b"a");
        save(&mut repo, "home", 2_000, b"b");
        let first = format!("home/{}", format_save_time(1_000));

        let report = run_rm(&mut repo, &names(&[&first, "home/latest"]), &config()).unwrap();
        assert!(report.tally.is_clean());
        assert_eq!(tip(&repo, "home"), None);
    }

    #[test]
    fn whole_branch_subsumes_its_saves() {
        let mut repo = MemoryRepo::new();
        save(&mut repo, "home", 1_000, b"a");

        let report = run_rm(&mut repo, &names(&["home/latest", "home"]), &config()).unwrap();
        assert!(report.tally.is_clean());
        assert_eq!(
            report.outcomes[0].result.as_ref().ok(),
            Some(&Removal::WithBranch { branch: "home".into() })
        );
        assert_eq!(tip(&repo, "home"), None);
    }

    #[test]
    fn unknown_save_is_not_found() {
        let mut repo = MemoryRepo::new();
        let a = save(&mut repo, "home", 1_000, b"a");

        let report = run_rm(&mut repo, &names(&["home/1999-01-01-000000"]), &config()).unwrap();
        assert_eq!(report.tally.count(), 1);
        assert_eq!(tip(&repo, "home"), Some(a));
    }

    #[test]
    fn malformed_history_fails_every_save_of_the_branch() {
        let mut repo = MemoryRepo::new();
        let blob = repo
            .objects
            .write(&StoredObject::new(ObjectKind::Blob, b"not a save".to_vec()))
            .unwrap();
        repo.refs
            .write_ref("refs/heads/broken", &Ref::branch("broken", blob))
            .unwrap();

        let batch = names(&["broken/latest", "broken/2000-01-01-000000"]);
        let report = run_rm(&mut repo, &batch, &config()).unwrap();
        assert_eq!(report.tally.count(), 2);
        for outcome in &report.outcomes {
            assert!(matches!(
                outcome.result.as_ref().map_err(|e| &**e),
                Err(RemovalError::MalformedHistory { .. })
            ));
        }
        assert_eq!(tip(&repo, "broken"), Some(blob));
    }

    #[test]
    fn invalid_names_are_reported_per_name() {
        let mut repo = MemoryRepo::new();
        let id = save(&mut repo, "home", 1_000, b"a");
        let batch = vec![vec![0xFF, 0xFE], b"a/b/c".to_vec(), b"home".to_vec()];

        let report = run_rm(&mut repo, &batch, &config()).unwrap();
        assert_eq!(report.tally.count(), 2);
        assert!(report.outcomes[..2].iter().all(|o| matches!(
            o.result.as_ref().map_err(|e| &**e),
            Err(RemovalError::InvalidName { .. })
        )));
        assert_eq!(report.outcomes[0].name, "\u{FFFD}\u{FFFD}");
        assert_eq!(tip(&repo, "home"), None);
        assert!(repo.read_object(&id).unwrap().is_some());
    }

    #[test]
    fn configuration_errors_touch_nothing() {
        let mut repo = MemoryRepo::new();
        let id = save(&mut repo, "home", 1_000, b"a");

        let err = run_rm(&mut repo, &names(&["home"]), &RmConfig::default()).unwrap_err();
        assert!(matches!(err, RmError::Config(ConfigError::NotAcknowledged)));
        let err = run_rm(&mut repo, &[], &config()).unwrap_err();
        assert!(matches!(err, RmError::Config(ConfigError::NoNames)));
        assert_eq!(tip(&repo, "home"), Some(id));
    }
}

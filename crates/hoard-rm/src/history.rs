//! A branch's saves, oldest first, with their path names.

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use hoard_repo::RepoHandle;
use hoard_store::{ObjectKind, Snapshot};
use hoard_types::ObjectId;

use crate::error::RemovalError;

/// Format of the timestamp part of a save name.
pub const SAVE_TIME_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// One save of a branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Save {
    pub id: ObjectId,
    pub snapshot: Snapshot,
    /// Name of the save under its branch, unique within the branch.
    pub name: String,
}

/// Render a save timestamp (seconds since the epoch, UTC).
pub fn format_save_time(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(time) => time.format(SAVE_TIME_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// Names for saves given oldest first. Saves sharing a second are told
/// apart by `-1`, `-2`, ... in age order, whether or not they are adjacent
/// in the history.
pub fn save_names(timestamps: &[i64]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    timestamps
        .iter()
        .map(|ts| {
            let base = format_save_time(*ts);
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 { base } else { format!("{base}-{count}") };
            *count += 1;
            name
        })
        .collect()
}

/// Follow the parent chain from `tip` and return the saves oldest first.
pub fn load_history(
    repo: &dyn RepoHandle,
    branch: &str,
    tip: ObjectId,
) -> Result<Vec<Save>, RemovalError> {
    let malformed = |reason: String| RemovalError::MalformedHistory {
        branch: branch.to_string(),
        reason,
    };

    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(tip);
    while let Some(id) = next {
        if !seen.insert(id) {
            return Err(malformed(format!("save {} is its own ancestor", id.short_hex())));
        }
        let obj = repo
            .read_object(&id)?
            .ok_or_else(|| malformed(format!("save {} is missing", id.short_hex())))?;
        if obj.kind != ObjectKind::Snapshot {
            return Err(malformed(format!(
                "{} is a {:?}, not a save",
                id.short_hex(),
                obj.kind
            )));
        }
        let snapshot = Snapshot::from_stored_object(&obj)
            .map_err(|e| malformed(format!("save {} is unreadable: {e}", id.short_hex())))?;
        next = snapshot.parent;
        chain.push((id, snapshot));
    }
    chain.reverse();

    let timestamps: Vec<i64> = chain.iter().map(|(_, s)| s.timestamp).collect();
    let saves = chain
        .into_iter()
        .zip(save_names(&timestamps))
        .map(|((id, snapshot), name)| Save { id, snapshot, name })
        .collect::<Vec<_>>();
    tracing::debug!(branch, saves = saves.len(), "loaded history");
    Ok(saves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_repo::MemoryRepo;
    use hoard_store::{StoredObject, Tree};

    #[test]
    fn save_time_format() {
        assert_eq!(format_save_time(0), "1970-01-01-000000");
        assert_eq!(format_save_time(1_700_000_000), "2023-11-14-221320");
    }

    #[test]
    fn same_second_saves_are_numbered_oldest_first() {
        assert_eq!(
            save_names(&[5, 5, 5, 6, 6]),
            vec![
                "1970-01-01-000005",
                "1970-01-01-000005-1",
                "1970-01-01-000005-2",
                "1970-01-01-000006",
                "1970-01-01-000006-1",
            ]
        );
    }

    #[test]
    fn repeated_second_after_clock_skew_stays_unique() {
        let names = save_names(&[5, 6, 5]);
        assert_eq!(
            names,
            vec!["1970-01-01-000005", "1970-01-01-000006", "1970-01-01-000005-1"]
        );
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    fn store_snapshot(repo: &MemoryRepo, timestamp: i64, parent: Option<ObjectId>) -> ObjectId {
        let tree = Tree::empty().to_stored_object().unwrap();
        repo.objects.write(&tree).unwrap();
        let snapshot = Snapshot {
            tree: tree.compute_id(),
            parent,
            timestamp,
            author: "tester".into(),
            message: String::new(),
        };
        repo.objects.write(&snapshot.to_stored_object().unwrap()).unwrap()
    }

    #[test]
    fn history_is_oldest_first() {
        let repo = MemoryRepo::new();
        let a = store_snapshot(&repo, 10, None);
        let b = store_snapshot(&repo, 20, Some(a));
        let c = store_snapshot(&repo, 20, Some(b));

        let saves = load_history(&repo, "home", c).unwrap();
        let ids: Vec<ObjectId> = saves.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert_eq!(saves[2].name, "1970-01-01-000020-1");
    }

    #[test]
    fn missing_parent_is_malformed() {
        let repo = MemoryRepo::new();
        let orphan = store_snapshot(&repo, 10, Some(ObjectId::from_bytes(b"gone")));
        let err = load_history(&repo, "home", orphan).unwrap_err();
        assert!(matches!(err, RemovalError::MalformedHistory { ref branch, .. } if branch == "home"));
    }

    #[test]
    fn non_snapshot_tip_is_malformed() {
        let repo = MemoryRepo::new();
        let blob = repo
            .objects
            .write(&StoredObject::new(ObjectKind::Blob, b"not a save".to_vec()))
            .unwrap();
        assert!(matches!(
            load_history(&repo, "home", blob),
            Err(RemovalError::MalformedHistory { .. })
        ));
    }
}

//! Reachability walk from the reference roots.

use std::collections::HashSet;
use std::fmt;

use hoard_store::{Object, ObjectKind, ObjectStore};
use hoard_types::ObjectId;

/// A store-integrity problem found while walking.
///
/// Anomalies never stop the walk. The object graph below them is simply
/// not followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anomaly {
    /// `referrer` points at `id`, which the store does not hold.
    MissingObject { id: ObjectId, referrer: ObjectId },
    /// The ref named `root` points at `id`, which the store does not hold.
    DanglingRoot { root: String, id: ObjectId },
    /// `id` exists but could not be read or decoded.
    CorruptObject { id: ObjectId, reason: String },
}

impl Anomaly {
    /// The object whose pack is implicated by this anomaly, if any.
    pub fn affected_object(&self) -> Option<ObjectId> {
        match self {
            Anomaly::MissingObject { referrer, .. } => Some(*referrer),
            Anomaly::CorruptObject { id, .. } => Some(*id),
            Anomaly::DanglingRoot { .. } => None,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MissingObject { id, referrer } => {
                write!(f, "missing object {} referenced by {}", id.short_hex(), referrer.short_hex())
            }
            Anomaly::DanglingRoot { root, id } => {
                write!(f, "ref {root} points at missing object {}", id.short_hex())
            }
            Anomaly::CorruptObject { id, reason } => {
                write!(f, "corrupt object {}: {reason}", id.short_hex())
            }
        }
    }
}

/// Every object reachable from the roots, exactly once.
#[derive(Debug, Default)]
pub struct Reachable {
    visited: HashSet<ObjectId>,
    anomalies: Vec<Anomaly>,
}

impl Reachable {
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    /// Enumerate the reachable ids in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.visited.iter()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.visited.contains(id)
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn into_anomalies(self) -> Vec<Anomaly> {
        self.anomalies
    }
}

enum Referrer<'a> {
    Root(&'a str),
    Object(ObjectId),
}

/// Walk the object graph from `roots` (`(ref name, target)` pairs).
///
/// Edges: snapshot to its tree and parent, tree to every entry, tag to its
/// target. Objects that are referenced but absent or unreadable are
/// recorded as [`Anomaly`] values and count as reachable, so nothing that
/// shares their id is ever dropped.
pub fn walk<S>(store: &S, roots: &[(String, ObjectId)]) -> Reachable
where
    S: ObjectStore + ?Sized,
{
    let mut reachable = Reachable::default();
    let mut stack: Vec<(ObjectId, Referrer<'_>)> = Vec::new();

    for (name, id) in roots {
        if reachable.visited.insert(*id) {
            stack.push((*id, Referrer::Root(name)));
        }
    }

    while let Some((id, referrer)) = stack.pop() {
        let obj = match store.read(&id) {
            Ok(Some(obj)) => obj,
            Ok(None) => {
                let anomaly = match referrer {
                    Referrer::Root(root) => Anomaly::DanglingRoot {
                        root: root.to_string(),
                        id,
                    },
                    Referrer::Object(referrer) => Anomaly::MissingObject { id, referrer },
                };
                tracing::warn!("{anomaly}");
                reachable.anomalies.push(anomaly);
                continue;
            }
            Err(e) => {
                let anomaly = Anomaly::CorruptObject {
                    id,
                    reason: e.to_string(),
                };
                tracing::warn!("{anomaly}");
                reachable.anomalies.push(anomaly);
                continue;
            }
        };
        if obj.kind == ObjectKind::Blob {
            continue;
        }

        let children: Vec<ObjectId> = match obj.decode() {
            Ok(Object::Tree(tree)) => tree.entries.iter().map(|e| e.object_id).collect(),
            Ok(Object::Snapshot(snapshot)) => {
                let mut children = vec![snapshot.tree];
                children.extend(snapshot.parent);
                children
            }
            Ok(Object::Tag(tag)) => vec![tag.target],
            Ok(Object::Blob(_)) => Vec::new(),
            Err(e) => {
                let anomaly = Anomaly::CorruptObject {
                    id,
                    reason: e.to_string(),
                };
                tracing::warn!("{anomaly}");
                reachable.anomalies.push(anomaly);
                continue;
            }
        };
        for child in children {
            if reachable.visited.insert(child) {
                stack.push((child, Referrer::Object(id)));
            }
        }
    }

    tracing::debug!(
        objects = reachable.len(),
        anomalies = reachable.anomalies.len(),
        "walk complete"
    );
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_store::{
        EntryMode, InMemoryObjectStore, Snapshot, StoredObject, TagObject, Tree, TreeEntry,
    };

    fn put_blob(store: &InMemoryObjectStore, data: &[u8]) -> ObjectId {
        store
            .write(&StoredObject::new(ObjectKind::Blob, data.to_vec()))
            .unwrap()
    }

    fn put_tree(store: &InMemoryObjectStore, entries: Vec<TreeEntry>) -> ObjectId {
        store.write(&Tree::new(entries).to_stored_object().unwrap()).unwrap()
    }

    fn put_snapshot(store: &InMemoryObjectStore, tree: ObjectId, parent: Option<ObjectId>) -> ObjectId {
        let snapshot = Snapshot {
            tree,
            parent,
            timestamp: 1_700_000_000,
            author: "tester".into(),
            message: String::new(),
        };
        store.write(&snapshot.to_stored_object().unwrap()).unwrap()
    }

    fn root(name: &str, id: ObjectId) -> (String, ObjectId) {
        (name.to_string(), id)
    }

    #[test]
    fn closure_follows_parents_and_shares_blobs() {
        let store = InMemoryObjectStore::new();
        let shared = put_blob(&store, b"shared");
        let only_old = put_blob(&store, b"old");
        let tree1 = put_tree(
            &store,
            vec![
                TreeEntry::new(EntryMode::Regular, "a", shared),
                TreeEntry::new(EntryMode::Regular, "b", only_old),
            ],
        );
        let tree2 = put_tree(&store, vec![TreeEntry::new(EntryMode::Regular, "a", shared)]);
        let save1 = put_snapshot(&store, tree1, None);
        let save2 = put_snapshot(&store, tree2, Some(save1));
        let unreachable = put_blob(&store, b"garbage");

        let reachable = walk(&store, &[root("refs/heads/home", save2)]);

        for id in [shared, only_old, tree1, tree2, save1, save2] {
            assert!(reachable.contains(&id));
        }
        assert!(!reachable.contains(&unreachable));
        assert_eq!(reachable.len(), 6);
        assert_eq!(reachable.iter().count(), 6);
        assert!(reachable.anomalies().is_empty());
    }

    #[test]
    fn nested_trees_and_tags() {
        let store = InMemoryObjectStore::new();
        let leaf = put_blob(&store, b"leaf");
        let inner = put_tree(&store, vec![TreeEntry::new(EntryMode::Regular, "f", leaf)]);
        let outer = put_tree(&store, vec![TreeEntry::new(EntryMode::Directory, "d", inner)]);
        let tag = TagObject {
            target: outer,
            target_kind: ObjectKind::Tree,
            name: "pinned".into(),
            message: String::new(),
        };
        let tag_id = store.write(&tag.to_stored_object().unwrap()).unwrap();

        let reachable = walk(&store, &[root("refs/tags/pinned", tag_id)]);
        assert_eq!(reachable.len(), 4);
        assert!(reachable.contains(&leaf));
    }

    #[test]
    fn shared_roots_visit_once() {
        let store = InMemoryObjectStore::new();
        let blob = put_blob(&store, b"x");
        let tree = put_tree(&store, vec![TreeEntry::new(EntryMode::Regular, "x", blob)]);
        let save = put_snapshot(&store, tree, None);

        let reachable = walk(
            &store,
            &[root("refs/heads/a", save), root("refs/heads/b", save), root("refs/tags/t", blob)],
        );
        assert_eq!(reachable.len(), 3);
    }

    #[test]
    fn missing_objects_are_anomalies() {
        let store = InMemoryObjectStore::new();
        let ghost = ObjectId::from_bytes(b"never written");
        let tree = put_tree(&store, vec![TreeEntry::new(EntryMode::Regular, "gone", ghost)]);
        let save = put_snapshot(&store, tree, None);
        let dangling = ObjectId::from_bytes(b"dangling tip");

        let reachable = walk(&store, &[root("refs/heads/home", save), root("refs/heads/lost", dangling)]);

        assert!(reachable.contains(&tree));
        let anomalies = reachable.anomalies();
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies.contains(&Anomaly::MissingObject { id: ghost, referrer: tree }));
        assert!(anomalies.contains(&Anomaly::DanglingRoot {
            root: "refs/heads/lost".into(),
            id: dangling,
        }));
        for anomaly in anomalies {
            match anomaly {
                Anomaly::MissingObject { .. } => assert_eq!(anomaly.affected_object(), Some(tree)),
                _ => assert_eq!(anomaly.affected_object(), None),
            }
        }
    }

    #[test]
    fn undecodable_object_is_an_anomaly() {
        let store = InMemoryObjectStore::new();
        let bad = store
            .write(&StoredObject::new(ObjectKind::Tree, b"not json".to_vec()))
            .unwrap();

        let reachable = walk(&store, &[root("refs/heads/home", bad)]);
        assert!(reachable.contains(&bad));
        assert!(matches!(
            reachable.anomalies(),
            [Anomaly::CorruptObject { id, .. }] if *id == bad
        ));
    }

    #[test]
    fn no_roots_no_objects() {
        let store = InMemoryObjectStore::new();
        put_blob(&store, b"orphan");
        let reachable = walk(&store, &[]);
        assert!(reachable.is_empty());
    }
}

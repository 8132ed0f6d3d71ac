//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] stores all refs in a `BTreeMap` protected by a
//! `RwLock`, so listings come out sorted without extra work.

use std::collections::BTreeMap;
use std::sync::RwLock;

use hoard_types::ObjectId;

use crate::error::{RefError, Result};
use crate::traits::{check_expected, RefStore};
use crate::types::Ref;

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, Ref>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_name(name: &str, reference: &Ref) -> Result<()> {
    reference.validate()?;
    if name != reference.canonical_name() {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: format!("does not match ref {}", reference.canonical_name()),
        });
    }
    Ok(())
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs.get(name).cloned())
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        check_name(name, reference)?;
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        if refs.get(name).is_some_and(Ref::is_tag) {
            return Err(RefError::TagImmutable {
                name: name.to_string(),
            });
        }
        refs.insert(name.to_string(), reference.clone());
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let refs = self.refs.read().map_err(|_| RefError::Poisoned)?;
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn update_ref(&self, name: &str, new: &Ref, expected: Option<ObjectId>) -> Result<()> {
        check_name(name, new)?;
        let mut refs = self.refs.write().map_err(|_| RefError::Poisoned)?;
        let current = refs.get(name);
        if new.is_tag() && current.is_some() {
            return Err(RefError::TagImmutable {
                name: name.to_string(),
            });
        }
        check_expected(name, current, expected)?;
        refs.insert(name.to_string(), new.clone());
        Ok(())
    }
}

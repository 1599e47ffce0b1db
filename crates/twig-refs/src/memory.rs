//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps refs and reflogs in `HashMap`s behind a single
//! `RwLock`, which also serves as the compare-and-swap critical section.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;
use twig_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::{RefStore, MAX_SYMBOLIC_DEPTH};
use crate::types::{Ref, RefLogEntry, RefUpdate};

#[derive(Debug, Default)]
struct RefTable {
    refs: HashMap<String, Ref>,
    logs: HashMap<String, Vec<RefLogEntry>>,
}

impl RefTable {
    fn follow(&self, name: &str) -> Result<String> {
        let mut current = name;
        for _ in 0..=MAX_SYMBOLIC_DEPTH {
            match self.refs.get(current) {
                Some(Ref::Symbolic(target)) => current = target.as_str(),
                _ => return Ok(current.to_string()),
            }
        }
        Err(RefError::SymbolicLoop {
            name: name.to_string(),
        })
    }
}

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    table: RwLock<RefTable>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::Serialization(format!("lock poisoned: {e}"))
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.refs.get(name).cloned())
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
        update: &RefUpdate,
    ) -> Result<bool> {
        validate_ref_name(name)?;
        let mut table = self.table.write().map_err(poisoned)?;
        let target = table.follow(name)?;
        validate_ref_name(&target)?;

        let current = table.refs.get(&target).and_then(Ref::target_id);
        if current != expected {
            debug!(%target, ?expected, ?current, "compare-and-set rejected");
            return Ok(false);
        }

        table.refs.insert(target.clone(), Ref::Direct(new));
        table
            .logs
            .entry(target.clone())
            .or_default()
            .push(RefLogEntry::from_update(current, new, update));
        debug!(%target, %new, "ref updated");
        Ok(true)
    }

    fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let mut table = self.table.write().map_err(poisoned)?;
        table
            .refs
            .insert(name.to_string(), Ref::Symbolic(target.to_string()));
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.logs.remove(name);
        Ok(table.refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let table = self.table.read().map_err(poisoned)?;
        let mut result: Vec<(String, Ref)> = table
            .refs
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    fn reflog(&self, name: &str) -> Result<Vec<RefLogEntry>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.logs.get(name).cloned().unwrap_or_default())
    }
}

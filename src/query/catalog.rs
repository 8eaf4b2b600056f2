//! Relation lookup for the executor.
//!
//! Queries never see a relation change underneath them: a lookup returns an
//! `Arc` snapshot, and re-registering a name swaps in a new `Arc` while running
//! queries keep the one they already hold.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::query::errors::{QueryError, Result};
use crate::query::relation::Relation;

/// Provides relations to the executor by name.
pub trait RelationProvider: Send + Sync {
    /// Returns a snapshot of the named relation.
    fn relation(&self, name: &str) -> Result<Arc<Relation>>;
}

/// In-memory catalog of named relations, shareable across threads.
#[derive(Debug, Default)]
pub struct Catalog {
    relations: RwLock<HashMap<String, Arc<Relation>>>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `relation` under its own name, replacing any previous
    /// relation of that name. Returns the replaced snapshot.
    pub fn register(&self, relation: Relation) -> Result<Option<Arc<Relation>>> {
        let name = relation
            .name()
            .map(str::to_owned)
            .ok_or_else(|| QueryError::schema_violation("<derived>", "only named relations can be registered"))?;
        Ok(self.register_as(name, Arc::new(relation)))
    }

    /// Registers an existing snapshot under `name`.
    ///
    /// A relation registered under a name other than its own is stored as a
    /// renamed copy whose columns are qualified by `name`.
    pub fn register_as(&self, name: impl Into<String>, relation: Arc<Relation>) -> Option<Arc<Relation>> {
        let name = name.into();
        let relation = match relation.name() {
            Some(own) if own.eq_ignore_ascii_case(&name) => relation,
            _ => Arc::new(relation.renamed(&name)),
        };
        let rows = relation.len();
        let previous = self.relations.write().insert(key(&name), relation);
        if previous.is_some() {
            info!(relation = %name, rows, "catalog.replace");
        } else {
            debug!(relation = %name, rows, "catalog.register");
        }
        previous
    }

    /// Removes the named relation; running queries keep their snapshot.
    pub fn remove(&self, name: &str) -> Option<Arc<Relation>> {
        self.relations.write().remove(&key(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .relations
            .read()
            .values()
            .map(|r| r.display_name().to_owned())
            .collect();
        names.sort();
        names
    }

    /// Number of registered relations.
    pub fn len(&self) -> usize {
        self.relations.read().len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.relations.read().is_empty()
    }
}

impl RelationProvider for Catalog {
    fn relation(&self, name: &str) -> Result<Arc<Relation>> {
        self.relations
            .read()
            .get(&key(name))
            .cloned()
            .ok_or_else(|| QueryError::UnknownRelation {
                name: name.to_owned(),
            })
    }
}

/// Relation names resolve case-insensitively, like column names.
fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

//! Process-wide registry of collection handles.
//!
//! Entity types are named by clients at request time. The registry maps each name to a
//! single [`Collection`] handle, creating it on first use and reusing it for the lifetime of
//! the registry. Handles are never removed.

use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use crate::{collection::Collection, store::DocumentStore};

/// Get-or-create mapping from entity type name to collection handle.
///
/// Any string is accepted as a name; the registry does not validate or limit them.
#[derive(Debug)]
pub struct CollectionRegistry {
    store: DocumentStore,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl CollectionRegistry {
    /// Creates an empty registry over the given store.
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the handle for `entity_type`, creating and registering it if needed.
    ///
    /// Concurrent callers asking for the same name always receive the same handle.
    pub async fn resolve(&self, entity_type: &str) -> Arc<Collection> {
        if let Some(collection) = self.collections.read().await.get(entity_type) {
            return Arc::clone(collection);
        }

        // Another task may have registered the name between the two locks.
        let mut collections = self.collections.write().await;
        Arc::clone(
            collections
                .entry(entity_type.to_string())
                .or_insert_with(|| Arc::new(self.store.collection(entity_type))),
        )
    }

    /// Returns the names registered so far, sorted.
    pub async fn entity_types(&self) -> Vec<String> {
        let mut names = self
            .collections
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();
        names
    }

    /// Returns the number of registered names.
    pub async fn len(&self) -> usize {
        self.collections.read().await.len()
    }

    /// Returns true if no name has been registered yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

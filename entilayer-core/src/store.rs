//! Main document store interface.
//!
//! [`DocumentStore`] owns a storage backend behind dynamic dispatch so the backend can be
//! chosen at runtime (for example from configuration) and shared across tasks.
//!
//! # Example
//!
//! ```ignore
//! use entilayer_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let tasks = store.collection("tasks");
//! ```

use std::sync::Arc;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::DocumentStoreResult,
};

/// A document store bound to a backend chosen at runtime.
///
/// Cloning a store is cheap; clones share the same backend.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    backend: Arc<dyn StoreBackend>,
}

impl DocumentStore {
    /// Creates a new document store with the given backend.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Creates a handle for the named collection.
    ///
    /// This does not touch the backend; collections are created on first write. Prefer
    /// [`CollectionRegistry::resolve`](crate::registry::CollectionRegistry::resolve), which
    /// hands out one shared handle per name.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(name.to_string(), Arc::clone(&self.backend))
    }

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if it is not.
    pub async fn ping(&self) -> DocumentStoreResult<()> {
        self.backend.ping().await
    }

    /// Shuts down the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the backend fails
    /// to release its resources.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

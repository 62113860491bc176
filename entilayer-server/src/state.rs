//! Application state shared across handlers

use std::sync::Arc;

use entilayer_core::{registry::CollectionRegistry, store::DocumentStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: CollectionRegistry,
}

impl AppState {
    pub fn new(registry: CollectionRegistry) -> Self {
        Self {
            inner: Arc::new(AppStateInner { registry }),
        }
    }

    /// State over a fresh registry for `store`.
    pub fn from_store(store: DocumentStore) -> Self {
        Self::new(CollectionRegistry::new(store))
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.inner.registry
    }

    pub fn store(&self) -> &DocumentStore {
        self.inner.registry.store()
    }
}

//! Collection handles for entity operations.
//!
//! A [`Collection`] binds a collection name to a storage backend and offers the entity
//! operations the service needs. Handles are cheap to clone and are normally obtained from a
//! [`CollectionRegistry`](crate::registry::CollectionRegistry) so that each name maps to a
//! single handle.
//!
//! # Example
//!
//! ```ignore
//! use bson::Bson;
//!
//! let tasks = registry.resolve("tasks").await;
//! let created = tasks.insert(Bson::String("write docs".into())).await?;
//! let fetched = tasks.find_by_id(&created.id().to_hex()).await?;
//! ```

use bson::{Bson, doc};
use std::sync::Arc;

use crate::{
    backend::StoreBackend,
    document::{DATA_FIELD, EntityDocument, ensure_data_present, parse_identifier},
    error::DocumentStoreResult,
    query::{Query, cast_identifiers},
};

/// A schema-less collection of entity documents.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    backend: Arc<dyn StoreBackend>,
}

impl Collection {
    /// Creates a new collection handle (internal use).
    pub(crate) fn new(name: String, backend: Arc<dyn StoreBackend>) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a new document holding `data` and returns it with its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`](crate::error::DocumentStoreError::InvalidDocument)
    /// if `data` is null, or a backend error if the insert fails.
    pub async fn insert(&self, data: Bson) -> DocumentStoreResult<EntityDocument> {
        let document = EntityDocument::new(data)?;

        self.backend
            .insert_documents(vec![(document.id, document.to_bson()?)], self.name())
            .await?;

        Ok(document)
    }

    /// Returns every document in the collection in its natural order.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn find_all(&self) -> DocumentStoreResult<Vec<Bson>> {
        self.find(Query::new()).await
    }

    /// Queries documents in the collection.
    ///
    /// Hex strings under `_id` in the filter are matched as identifiers.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the filter is not
    /// understood by the backend or the operation fails.
    pub async fn find(&self, mut query: Query) -> DocumentStoreResult<Vec<Bson>> {
        query.filter = query.filter.map(cast_identifiers);

        self.backend
            .query_documents(query, self.name())
            .await
    }

    /// Fetches the document with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`](crate::error::DocumentStoreError::InvalidIdentifier)
    /// if `id` is malformed, or a backend error if the lookup fails.
    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<Option<Bson>> {
        let id = parse_identifier(id)?;

        Ok(self
            .backend
            .get_documents(vec![id], self.name())
            .await?
            .into_iter()
            .next())
    }

    /// Replaces the `data` field of the document with the given identifier and returns the
    /// updated document, or `None` if there is no such document.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is malformed, `data` is null or the update fails.
    pub async fn update_data(&self, id: &str, data: Bson) -> DocumentStoreResult<Option<Bson>> {
        let id = parse_identifier(id)?;
        ensure_data_present(&data)?;

        self.backend
            .update_document(id, doc! { DATA_FIELD: data }, self.name())
            .await
    }
}

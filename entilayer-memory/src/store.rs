//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that stores documents as BSON values
//! per collection, in insertion order, behind an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};

use entilayer_core::{
    query::Query,
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder},
};

use crate::{evaluator::DocumentEvaluator, projection::apply_projection};

type CollectionEntries = Vec<(ObjectId, Bson)>;
type StoreMap = HashMap<String, CollectionEntries>;


/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a document store that
/// operates entirely in memory. Documents keep the order they were inserted in, which is
/// also the order queries return them in.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing). Use the MongoDB backend for
/// anything beyond development and tests.
///
/// # Example
///
/// ```ignore
/// use entilayer_memory::InMemoryStore;
/// use entilayer_core::backend::StoreBackend;
/// use bson::{Bson, doc, oid::ObjectId};
///
/// let store = InMemoryStore::new();
/// let id = ObjectId::new();
///
/// store.insert_documents(vec![(id, Bson::Document(doc! { "_id": id, "data": 1 }))], "tasks").await?;
/// assert_eq!(store.get_documents(vec![id], "tasks").await?.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(ObjectId, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let entries = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            if entries.iter().any(|(existing, _)| *existing == id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_hex(), collection.to_string()));
            }

            entries.push((id, doc));
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<ObjectId>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let entries = match store.get(collection) {
            Some(entries) => entries,
            None => return Ok(vec![]),
        };

        Ok(
            entries
                .iter()
                .filter(|(id, _)| ids.contains(id))
                .map(|(_, doc)| doc.clone())
                .collect()
        )
    }

    async fn update_document(&self, id: ObjectId, fields: Document, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let entry = store
            .get_mut(collection)
            .and_then(|entries| entries.iter_mut().find(|(existing, _)| *existing == id));

        let Some((_, doc)) = entry else {
            return Ok(None);
        };

        let Some(doc_map) = doc.as_document_mut() else {
            return Err(DocumentStoreError::InvalidDocument(
                format!("stored document {id} is not a document"),
            ));
        };

        for (field, value) in fields {
            doc_map.insert(field, value);
        }

        Ok(Some(doc.clone()))
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let filter = query.compile_filter()?;

        let store = self.store.read().await;
        let entries = match store.get(collection) {
            Some(entries) => entries,
            None => return Ok(vec![]),
        };

        let documents = entries.iter().map(|(_, doc)| doc);
        let filtered_docs = match &filter {
            Some(expr) => DocumentEvaluator::filter_documents(documents, expr)?,
            None => documents.cloned().collect::<Vec<_>>(),
        };

        Ok(
            filtered_docs
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .map(|doc| match &query.projection {
                    Some(projection) => apply_projection(doc, projection),
                    None => doc,
                })
                .collect()
        )
    }

    async fn ping(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// The in-memory store has no options, so building always succeeds.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

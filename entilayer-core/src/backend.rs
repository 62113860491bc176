//! Storage backend abstraction for the document store.
//!
//! This module defines the core traits that abstract over different storage implementations,
//! allowing the entity service to run against MongoDB in production and an in-memory store
//! in development and tests.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for the storage operations
//! the entity service needs: inserting documents, fetching them by identifier, updating
//! them in place and querying them with a filter, projection and pagination.
//! Implementations are required to be thread-safe (`Send + Sync`) and support concurrent access.
//! Every method takes `&self`, so a backend can be shared as `Arc<dyn StoreBackend>`.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use entilayer_core::backend::StoreBackend;
//! use bson::{Bson, doc, oid::ObjectId};
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = ObjectId::new();
//! let document = Bson::Document(doc! { "_id": id, "data": { "name": "Alice" } });
//! backend.insert_documents(vec![(id, document)], "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::Query};

#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents. Each document already carries its `_id`.
    ///
    /// Collections that do not exist yet are created implicitly.
    async fn insert_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Fetches documents by identifier. Unknown identifiers are omitted from the result.
    async fn get_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Replaces the given top-level fields of one document and returns the document as it
    /// is after the update, or `None` if no document has that identifier.
    async fn update_document(
        &self,
        id: ObjectId,
        fields: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>>;

    /// Returns the documents matching the query, in the collection's natural order.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Releases any resources held by the backend.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

//! Datastore abstraction for schema-less entity collections.
//!
//! This crate is the core of the entilayer project and provides:
//!
//! - **Entity documents** ([`document`]) - The `{ _id, data }` document shape and BSON/JSON conversion
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Queries** ([`query`]) - Filters, projections, pagination and filter compilation
//! - **Collections** ([`collection`]) - Handles for working with one named collection
//! - **Document store** ([`store`]) - The runtime-selected backend shared by all handles
//! - **Collection registry** ([`registry`]) - Get-or-create handles keyed by entity type
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use entilayer_core::{registry::CollectionRegistry, store::DocumentStore};
//! use bson::Bson;
//!
//! let registry = CollectionRegistry::new(DocumentStore::new(backend));
//! let tasks = registry.resolve("tasks").await;
//! let task = tasks.insert(Bson::String("write docs".into())).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as entilayer_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod query;
pub mod registry;
pub mod store;

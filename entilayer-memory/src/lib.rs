//! In-memory document storage backend for entilayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion order** - Documents come back in the order they were stored
//! - **MongoDB-style filters** - Dotted paths, comparison, membership and logical operators
//! - **Projections** - Inclusion and exclusion of (nested) fields
//!
//! # Quick Start
//!
//! ```ignore
//! use entilayer_core::{backend::StoreBackendBuilder, store::DocumentStore};
//! use entilayer_memory::InMemoryStore;
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//! let tasks = store.collection("tasks");
//!
//! tasks.insert(doc! { "title": "write docs" }.into()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as entilayer_memory;

pub mod store;
pub mod evaluator;
pub mod projection;

pub use store::{InMemoryStore, InMemoryStoreBuilder};

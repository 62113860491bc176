//! MongoDB backend implementation for entilayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters reach the MongoDB query engine unchanged, so every operator MongoDB supports
//! can be used in entity searches.
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Native queries** - Filters, projections and pagination run on the server
//! - **Async/await** - Fully asynchronous API built on MongoDB's async driver
//!
//! # Example
//!
//! ```ignore
//! use entilayer_core::backend::StoreBackendBuilder;
//! use entilayer_mongodb::MongoDbStore;
//!
//! let store = MongoDbStore::builder("mongodb://localhost:27017", "entilayer")
//!     .build()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as entilayer_mongodb;

pub mod store;
pub mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};

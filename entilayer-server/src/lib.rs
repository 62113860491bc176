//! HTTP service for schema-less entity collections.
//!
//! Clients name an entity type per request; the server resolves the matching collection
//! through a [`CollectionRegistry`](entilayer_core::registry::CollectionRegistry) and runs a
//! single datastore operation against it.
//!
//! | Method & Path | Purpose |
//! |---|---|
//! | `POST /entities` | create an entity |
//! | `GET /entities/{entity_type}` | list every entity of a type |
//! | `GET /entities/{entity_type}/{id}` | fetch one entity |
//! | `PUT /entities/{entity_type}/{id}` | replace an entity's data |
//! | `GET /entities?entityType=&limit=&skip=&fields=&query=` | filtered, paginated list |
//! | `GET /health` | liveness and datastore status |

pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;
pub mod state;
pub mod tracing_setup;

pub use server::{build_router, build_store, run_server};
pub use state::AppState;

//! Query translation from entilayer queries to MongoDB find arguments.
//!
//! Filters are already MongoDB filter documents and are passed to the server untouched;
//! projection and pagination become [`FindOptions`].

use bson::{Document, doc};
use mongodb::options::FindOptions;

use entilayer_core::query::Query;


/// Returns the filter document for `query`, matching everything when it has none.
pub(crate) fn find_filter(query: &Query) -> Document {
    query.filter.clone().unwrap_or_else(|| doc! {})
}

/// Builds the find options carrying the projection, skip and limit of `query`.
pub(crate) fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();

    if let Some(limit) = query.limit {
        options.limit = Some(limit as i64);
    }
    if let Some(skip) = query.offset {
        options.skip = Some(skip as u64);
    }
    if let Some(projection) = &query.projection {
        options.projection = Some(projection.to_document());
    }

    options
}

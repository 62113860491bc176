//! Field selection for in-memory query results.
//!
//! Inclusion keeps the listed paths (plus `_id` unless it was excluded) in the order the
//! fields appear in the stored document. Exclusion drops the listed paths. Dotted paths
//! descend into embedded documents and into every document held by an array.

use bson::{Bson, Document};

use entilayer_core::{document::ID_FIELD, query::Projection};

type Paths<'a> = Vec<Vec<&'a str>>;

/// Applies `projection` to a stored document.
pub(crate) fn apply_projection(document: Bson, projection: &Projection) -> Bson {
    let Bson::Document(document) = document else {
        return document;
    };

    match projection {
        Projection::Include { fields, id } => {
            let mut paths = split_paths(fields);

            if *id {
                paths.push(vec![ID_FIELD]);
            }

            Bson::Document(include(&document, &paths))
        }
        Projection::Exclude(fields) => Bson::Document(exclude(document, &split_paths(fields))),
    }
}

fn split_paths(fields: &[String]) -> Paths<'_> {
    fields
        .iter()
        .map(|field| field.split('.').collect())
        .collect()
}

/// Returns the remainders of every path whose first segment is `key`.
fn descend<'a>(paths: &Paths<'a>, key: &str) -> Paths<'a> {
    paths
        .iter()
        .filter(|path| path.first() == Some(&key))
        .map(|path| path[1..].to_vec())
        .collect()
}

fn include(source: &Document, paths: &Paths<'_>) -> Document {
    let mut result = Document::new();

    for (key, value) in source {
        let nested = descend(paths, key);

        if nested.is_empty() {
            continue;
        }

        if nested.iter().any(Vec::is_empty) {
            result.insert(key.clone(), value.clone());
            continue;
        }

        match value {
            Bson::Document(child) => {
                result.insert(key.clone(), include(child, &nested));
            }
            Bson::Array(items) => {
                let items = items
                    .iter()
                    .filter_map(|item| match item {
                        Bson::Document(child) => Some(Bson::Document(include(child, &nested))),
                        _ => None,
                    })
                    .collect::<Vec<_>>();

                result.insert(key.clone(), items);
            }
            _ => {}
        }
    }

    result
}

fn exclude(source: Document, paths: &Paths<'_>) -> Document {
    let mut result = Document::new();

    for (key, value) in source {
        let nested = descend(paths, &key);

        if nested.iter().any(Vec::is_empty) {
            continue;
        }

        if nested.is_empty() {
            result.insert(key, value);
            continue;
        }

        let value = match value {
            Bson::Document(child) => Bson::Document(exclude(child, &nested)),
            Bson::Array(items) => Bson::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Bson::Document(child) => Bson::Document(exclude(child, &nested)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        };

        result.insert(key, value);
    }

    result
}

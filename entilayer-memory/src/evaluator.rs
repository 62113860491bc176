//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions,
//! enabling filtering and comparison operations on BSON documents with the
//! matching rules of MongoDB: dotted paths reach into embedded documents and arrays,
//! an equality matches an array that contains the value, and `null` matches a missing field.

use std::{collections::HashMap, cmp::Ordering};
use bson::{Bson, datetime::DateTime, oid::ObjectId};

use entilayer_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// filtering queries. It normalizes numeric types to f64 for easy comparison.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// ObjectId value
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON type, never equal to anything
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Collects every value reachable from `value` along `segments`.
///
/// Arrays are traversed transparently, and a numeric segment also indexes into an array.
fn lookup<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((segment, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(child) = doc.get(*segment) {
                lookup(child, rest, found);
            }
        }
        Bson::Array(items) => {
            if let Some(item) = segment.parse::<usize>().ok().and_then(|index| items.get(index)) {
                lookup(item, rest, found);
            }

            for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                lookup(item, segments, found);
            }
        }
        _ => {}
    }
}

/// Returns true if `candidate` equals `value`, or is an array holding `value`.
fn matches_eq(candidate: &Bson, value: &Bson) -> bool {
    let expected = Comparable::from(value);

    if Comparable::from(candidate) == expected {
        return true;
    }

    match candidate {
        Bson::Array(items) => items
            .iter()
            .any(|item| Comparable::from(item) == expected),
        _ => false,
    }
}

fn matches_ordering(candidate: &Bson, value: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let expected = Comparable::from(value);
    let compare = |item: &Bson| {
        Comparable::from(item)
            .partial_cmp(&expected)
            .is_some_and(accept)
    };

    match candidate {
        Bson::Array(items) => items.iter().any(compare),
        _ => compare(candidate),
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Keeps the documents matching `expr`, preserving their order.
    pub fn filter_documents<I>(documents: I, expr: &Expr) -> DocumentStoreResult<Vec<Bson>>
    where
        I: IntoIterator<Item = &'a Bson>,
    {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    fn resolve(&self, field: &str) -> Vec<&'a Bson> {
        let segments = field.split('.').collect::<Vec<_>>();
        let mut found = Vec::new();

        if matches!(self.document, Bson::Document(_)) {
            lookup(self.document, &segments, &mut found);
        }

        found
    }

    fn field_equals(&self, field: &str, value: &Bson) -> bool {
        let candidates = self.resolve(field);

        if candidates.is_empty() {
            return matches!(value, Bson::Null);
        }

        candidates
            .iter()
            .any(|candidate| matches_eq(candidate, value))
    }

    fn field_in(&self, field: &str, value: &Bson) -> DocumentStoreResult<bool> {
        match value {
            Bson::Array(values) => Ok(
                values
                    .iter()
                    .any(|value| self.field_equals(field, value))
            ),
            _ => Err(DocumentStoreError::InvalidQuery(
                format!("membership test on {field} needs an array"),
            )),
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!self.resolve(field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let ordering = |accept: fn(Ordering) -> bool| {
            self.resolve(field)
                .iter()
                .any(|candidate| matches_ordering(candidate, value, accept))
        };

        Ok(match op {
            FieldOp::Eq => self.field_equals(field, value),
            FieldOp::Ne => !self.field_equals(field, value),
            FieldOp::Gt => ordering(|o| o == Ordering::Greater),
            FieldOp::Gte => ordering(|o| o != Ordering::Less),
            FieldOp::Lt => ordering(|o| o == Ordering::Less),
            FieldOp::Lte => ordering(|o| o != Ordering::Greater),
            FieldOp::AnyOf => self.field_in(field, value)?,
            FieldOp::NoneOf => !self.field_in(field, value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn matches(document: Bson, filter: bson::Document) -> bool {
        DocumentEvaluator::new(&document)
            .evaluate(&Expr::try_from(&filter).unwrap())
            .unwrap()
    }

    fn task() -> Bson {
        Bson::Document(doc! {
            "_id": ObjectId::new(),
            "data": {
                "status": "done",
                "points": 5,
                "tags": ["home", "urgent"],
                "steps": [{ "name": "plan" }, { "name": "ship" }],
            },
        })
    }

    #[test]
    fn dotted_equality() {
        assert!(matches(task(), doc! { "data.status": "done" }));
        assert!(!matches(task(), doc! { "data.status": "open" }));
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert!(matches(task(), doc! { "data.points": 5.0 }));
        assert!(matches(task(), doc! { "data.points": { "$gt": 4_i64, "$lte": 5 } }));
        assert!(!matches(task(), doc! { "data.points": { "$lt": 5 } }));
    }

    #[test]
    fn arrays_match_contained_values() {
        assert!(matches(task(), doc! { "data.tags": "urgent" }));
        assert!(matches(task(), doc! { "data.steps.name": "ship" }));
        assert!(matches(task(), doc! { "data.tags.0": "home" }));
        assert!(!matches(task(), doc! { "data.tags": "work" }));
    }

    #[test]
    fn null_matches_missing_fields() {
        assert!(matches(task(), doc! { "data.owner": Bson::Null }));
        assert!(!matches(task(), doc! { "data.status": Bson::Null }));
    }

    #[test]
    fn membership_and_existence() {
        assert!(matches(task(), doc! { "data.status": { "$in": ["open", "done"] } }));
        assert!(matches(task(), doc! { "data.status": { "$nin": ["open"] } }));
        assert!(matches(task(), doc! { "data.owner": { "$exists": false } }));
        assert!(!matches(task(), doc! { "data.points": { "$exists": false } }));
    }

    #[test]
    fn logical_operators() {
        assert!(matches(task(), doc! { "$or": [{ "data.status": "open" }, { "data.points": 5 }] }));
        assert!(!matches(task(), doc! { "$nor": [{ "data.status": "done" }] }));
        assert!(matches(task(), doc! { "data.points": { "$not": { "$gt": 10 } } }));
        assert!(matches(task(), doc! { "data.status": { "$ne": "open" } }));
    }

    #[test]
    fn identifiers_compare_by_value() {
        let id = ObjectId::new();
        let document = Bson::Document(doc! { "_id": id, "data": 1 });

        assert!(matches(document.clone(), doc! { "_id": id }));
        assert!(!matches(document, doc! { "_id": ObjectId::new() }));
    }
}

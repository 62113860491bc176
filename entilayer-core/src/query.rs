//! Query construction, projection and filter compilation for document stores.
//!
//! A [`Query`] carries a MongoDB-style filter document, an optional [`Projection`] and
//! pagination. Backends with a native query engine pass the filter through untouched;
//! backends that evaluate filters themselves compile it into an [`Expr`] tree and walk it
//! with a [`QueryVisitor`].
//!
//! # Query Building
//!
//! ```ignore
//! use entilayer_core::query::{Query, Projection};
//! use bson::doc;
//!
//! let query = Query::builder()
//!     .filter(doc! { "data.status": "done" })
//!     .projection(Projection::parse("data.title,-_id")?)
//!     .limit(10)
//!     .offset(0)
//!     .build();
//! ```
//!
//! # Supported Filter Operators
//!
//! - Comparison: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`
//! - Membership: `$in`, `$nin`
//! - Existence: `$exists`
//! - Logical: `$and`, `$or`, `$nor`, `$not`

use bson::{Bson, Document, oid::ObjectId};

use crate::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match, or an array containing the value).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Field matches any of the values.
    AnyOf,
    /// Field matches none of the values.
    NoneOf,
}

impl FieldOp {
    fn from_operator(operator: &str) -> Option<Self> {
        Some(match operator {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::AnyOf,
            "$nin" => FieldOp::NoneOf,
            _ => return None,
        })
    }
}

/// A compiled filter expression.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex filter predicates.
///
/// # Example
///
/// ```ignore
/// use entilayer_core::query::Expr;
/// use bson::doc;
///
/// let expr = Expr::try_from(&doc! { "data.age": { "$gte": 18 }, "data.status": "active" })?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The (possibly dotted) field path to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: impl Into<String>, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field: field.into(), op, value }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    fn from_clauses(clauses: &Bson, operator: &str) -> DocumentStoreResult<Vec<Expr>> {
        match clauses {
            Bson::Array(items) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    Bson::Document(document) => Expr::try_from(document),
                    _ => Err(DocumentStoreError::InvalidQuery(
                        format!("{operator} entries must be objects"),
                    )),
                })
                .collect(),
            _ => Err(DocumentStoreError::InvalidQuery(
                format!("{operator} must be a nonempty array"),
            )),
        }
    }

    fn from_condition(field: &str, condition: &Bson) -> DocumentStoreResult<Expr> {
        let operators = match condition {
            Bson::Document(document) if is_operator_document(document) => document,
            // A plain value (including a document without operators) is an implicit $eq.
            _ => return Ok(Expr::field(field, FieldOp::Eq, condition.clone())),
        };

        let mut exprs = operators
            .iter()
            .map(|(operator, value)| match operator.as_str() {
                "$exists" => Ok(Expr::Exists(field.to_string(), is_truthy(value))),
                "$not" => match value {
                    Bson::Document(inner) if is_operator_document(inner) => {
                        Ok(Expr::from_condition(field, value)?.not())
                    }
                    _ => Err(DocumentStoreError::InvalidQuery(
                        "$not needs an operator expression".to_string(),
                    )),
                },
                _ => match FieldOp::from_operator(operator) {
                    Some(FieldOp::AnyOf | FieldOp::NoneOf) if !matches!(value, Bson::Array(_)) => {
                        Err(DocumentStoreError::InvalidQuery(
                            format!("{operator} needs an array, found {value}"),
                        ))
                    }
                    Some(op) => Ok(Expr::field(field, op, value.clone())),
                    None => Err(DocumentStoreError::InvalidQuery(
                        format!("unknown operator: {operator}"),
                    )),
                },
            })
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::And(exprs)
        })
    }
}

impl TryFrom<&Document> for Expr {
    type Error = DocumentStoreError;

    /// Compiles a MongoDB-style filter document.
    ///
    /// Top-level keys are ANDed together. An empty document matches everything.
    fn try_from(filter: &Document) -> Result<Self, Self::Error> {
        let exprs = filter
            .iter()
            .map(|(key, value)| match key.as_str() {
                "$and" => Ok(Expr::And(Expr::from_clauses(value, "$and")?)),
                "$or" => Ok(Expr::Or(Expr::from_clauses(value, "$or")?)),
                "$nor" => Ok(Expr::Or(Expr::from_clauses(value, "$nor")?).not()),
                operator if operator.starts_with('$') => Err(DocumentStoreError::InvalidQuery(
                    format!("unknown top level operator: {operator}"),
                )),
                field => Expr::from_condition(field, value),
            })
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(Expr::And(exprs))
    }
}

fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(number) => *number != 0,
        Bson::Int64(number) => *number != 0,
        Bson::Double(number) => *number != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Casts hex strings stored under `_id` keys into ObjectIds.
///
/// Clients only ever see identifiers as strings, so `{"_id": "65f0..."}` or
/// `{"_id": {"$in": ["65f0...", ...]}}` must be compared against ObjectIds. Strings that
/// are not valid ObjectIds are left untouched. Logical operators are traversed.
pub fn cast_identifiers(filter: Document) -> Document {
    filter
        .into_iter()
        .map(|(key, value)| {
            let value = match key.as_str() {
                ID_FIELD => cast_identifier_value(value),
                "$and" | "$or" | "$nor" => match value {
                    Bson::Array(items) => Bson::Array(
                        items
                            .into_iter()
                            .map(|item| match item {
                                Bson::Document(document) => Bson::Document(cast_identifiers(document)),
                                other => other,
                            })
                            .collect(),
                    ),
                    other => other,
                },
                _ => value,
            };

            (key, value)
        })
        .collect()
}

fn cast_identifier_value(value: Bson) -> Bson {
    match value {
        Bson::String(text) => match ObjectId::parse_str(&text) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(text),
        },
        Bson::Array(items) => Bson::Array(items.into_iter().map(cast_identifier_value).collect()),
        Bson::Document(document) if is_operator_document(&document) => Bson::Document(
            document
                .into_iter()
                .map(|(operator, operand)| (operator, cast_identifier_value(operand)))
                .collect(),
        ),
        other => other,
    }
}

/// Field selection applied to query results.
///
/// Follows MongoDB projection rules: a projection either includes or excludes fields,
/// except that `_id` may be excluded from an inclusion projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Only the listed fields are returned. `_id` is returned unless `id` is false.
    Include {
        /// The (possibly dotted) field paths to keep.
        fields: Vec<String>,
        /// Whether `_id` is kept.
        id: bool,
    },
    /// Everything except the listed fields is returned.
    Exclude(Vec<String>),
}

impl Projection {
    /// Parses a field list such as `"data.name,data.age"` or `"-data"`; entries are separated
    /// by commas or whitespace.
    ///
    /// A leading `-` excludes a field and a leading `+` is ignored. Blank entries are
    /// skipped. Returns `Ok(None)` if the list selects nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] if inclusions and exclusions are mixed.
    pub fn parse(fields: &str) -> DocumentStoreResult<Option<Self>> {
        let mut included = Vec::new();
        let mut excluded = Vec::new();

        for entry in fields.split(|c: char| c == ',' || c.is_whitespace()).filter(|entry| !entry.is_empty()) {
            match entry.strip_prefix('-') {
                Some(field) if !field.is_empty() => excluded.push(field.to_string()),
                Some(_) => continue,
                None => match entry.trim_start_matches('+') {
                    "" => continue,
                    field => included.push(field.to_string()),
                },
            }
        }

        if included.is_empty() {
            return Ok((!excluded.is_empty()).then(|| Projection::Exclude(excluded)));
        }

        if excluded.iter().any(|field| field != ID_FIELD) {
            return Err(DocumentStoreError::InvalidQuery(
                "projection cannot mix inclusion and exclusion".to_string(),
            ));
        }

        Ok(Some(Projection::Include {
            fields: included,
            id: excluded.is_empty(),
        }))
    }

    /// Renders this projection as a MongoDB projection document.
    pub fn to_document(&self) -> Document {
        match self {
            Projection::Include { fields, id } => {
                let mut document = fields
                    .iter()
                    .map(|field| (field.clone(), Bson::Int32(1)))
                    .collect::<Document>();

                if !id {
                    document.insert(ID_FIELD, 0);
                }

                document
            }
            Projection::Exclude(fields) => fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(0)))
                .collect(),
        }
    }
}

/// A structured query for retrieving and filtering documents.
///
/// This struct encapsulates the filter, projection, limit and offset for document
/// queries. Use [`QueryBuilder`] for ergonomic construction.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional MongoDB-style filter document.
    pub filter: Option<Document>,
    /// Optional field selection.
    pub projection: Option<Projection>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip (for pagination).
    pub offset: Option<usize>,
}

impl Query {
    /// Creates a new empty query that matches every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Compiles the filter into an expression tree, if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] if the filter uses unsupported operators.
    pub fn compile_filter(&self) -> DocumentStoreResult<Option<Expr>> {
        self.filter
            .as_ref()
            .map(Expr::try_from)
            .transpose()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter document for this query.
    pub fn filter(mut self, filter: Document) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the field selection for this query.
    pub fn projection(mut self, projection: Option<Projection>) -> Self {
        self.query.projection = projection;
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip (for pagination).
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn plain_values_compile_to_equality() {
        let expr = Expr::try_from(&doc! { "data.status": "done" }).unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![Expr::field("data.status", FieldOp::Eq, Bson::String("done".into()))]),
        );
    }

    #[test]
    fn operator_documents_compile_per_operator() {
        let expr = Expr::try_from(&doc! { "data.age": { "$gte": 18, "$lt": 65 } }).unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![Expr::And(vec![
                Expr::field("data.age", FieldOp::Gte, Bson::Int32(18)),
                Expr::field("data.age", FieldOp::Lt, Bson::Int32(65)),
            ])]),
        );
    }

    #[test]
    fn logical_operators_compile() {
        let expr = Expr::try_from(&doc! {
            "$or": [{ "data.a": 1 }, { "data.b": { "$exists": true } }],
        })
        .unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![Expr::Or(vec![
                Expr::And(vec![Expr::field("data.a", FieldOp::Eq, Bson::Int32(1))]),
                Expr::And(vec![Expr::Exists("data.b".into(), true)]),
            ])]),
        );
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let err = Expr::try_from(&doc! { "data.a": { "$near": 1 } }).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));

        let err = Expr::try_from(&doc! { "$where": "1 == 1" }).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
    }

    #[test]
    fn membership_operators_need_arrays() {
        let err = Expr::try_from(&doc! { "data.a": { "$in": 1 } }).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
    }

    #[test]
    fn identifier_strings_are_cast() {
        let oid = ObjectId::new();
        let cast = cast_identifiers(doc! {
            "_id": { "$in": [oid.to_hex(), "nope"] },
            "$or": [{ "_id": oid.to_hex() }],
            "data.ref": oid.to_hex(),
        });

        assert_eq!(
            cast,
            doc! {
                "_id": { "$in": [oid, "nope"] },
                "$or": [{ "_id": oid }],
                "data.ref": oid.to_hex(),
            },
        );
    }

    #[test]
    fn projection_parses_inclusions() {
        let projection = Projection::parse("data.name, data.age,,").unwrap();
        assert_eq!(
            projection,
            Some(Projection::Include {
                fields: vec!["data.name".into(), "data.age".into()],
                id: true,
            }),
        );
    }

    #[test]
    fn projection_allows_excluding_id_from_inclusion() {
        let projection = Projection::parse("data,-_id").unwrap().unwrap();
        assert_eq!(projection.to_document(), doc! { "data": 1, "_id": 0 });
    }

    #[test]
    fn projection_parses_exclusions() {
        let projection = Projection::parse("-data").unwrap();
        assert_eq!(projection, Some(Projection::Exclude(vec!["data".into()])));
    }

    #[test]
    fn projection_rejects_mixed_modes() {
        let err = Projection::parse("data.a,-data.b").unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
    }

    #[test]
    fn blank_projection_selects_nothing() {
        assert_eq!(Projection::parse(" , ").unwrap(), None);
        assert_eq!(Projection::parse("+").unwrap(), None);
        assert_eq!(Projection::parse("-").unwrap(), None);
    }

    #[test]
    fn bare_plus_entries_are_skipped() {
        let projection = Projection::parse("+,data.name,++").unwrap();
        assert_eq!(
            projection,
            Some(Projection::Include {
                fields: vec!["data.name".into()],
                id: true,
            }),
        );

        let projection = Projection::parse("+data.age").unwrap().unwrap();
        assert_eq!(projection.to_document(), doc! { "data.age": 1 });
    }
}

//! The entity document model and conversions between BSON and JSON.
//!
//! Every stored entity has the same shape, `{ _id, data }`, where `_id` is an
//! [`ObjectId`] assigned when the document is created and `data` is an arbitrary value.
//! Documents are kept as BSON inside the store and converted to plain JSON at the
//! edges of the system.

use bson::{Bson, de::deserialize_from_bson, doc, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the identifier field in every stored document.
pub const ID_FIELD: &str = "_id";

/// Name of the schema-less payload field in every stored document.
pub const DATA_FIELD: &str = "data";

/// A single stored entity.
///
/// The `data` field is schema-less: any BSON value is accepted except null.
///
/// # Example
///
/// ```ignore
/// use entilayer_core::document::EntityDocument;
/// use bson::Bson;
///
/// let entity = EntityDocument::new(Bson::String("hello".into()))?;
/// assert_eq!(entity.data, Bson::String("hello".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// The identifier, generated on creation and never changed.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// The client supplied payload.
    pub data: Bson,
}

impl EntityDocument {
    /// Creates a new document with a freshly generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if `data` is null.
    pub fn new(data: Bson) -> DocumentStoreResult<Self> {
        ensure_data_present(&data)?;

        Ok(Self { id: ObjectId::new(), data })
    }

    /// Returns a reference to this document's unique identifier.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Converts this document to a BSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    /// Creates a document from a BSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    pub fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    /// Converts this document to the JSON shape returned to clients.
    pub fn to_json(&self) -> Value {
        to_json(Bson::Document(doc! {
            ID_FIELD: self.id,
            DATA_FIELD: self.data.clone(),
        }))
    }
}

/// Rejects a missing (null) payload.
pub(crate) fn ensure_data_present(data: &Bson) -> DocumentStoreResult<()> {
    match data {
        Bson::Null | Bson::Undefined => Err(DocumentStoreError::InvalidDocument(
            format!("Path `{DATA_FIELD}` is required."),
        )),
        _ => Ok(()),
    }
}

/// Parses a client supplied identifier.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidIdentifier`] if `value` is not a valid ObjectId.
pub fn parse_identifier(value: &str) -> DocumentStoreResult<ObjectId> {
    ObjectId::parse_str(value)
        .map_err(|_| DocumentStoreError::InvalidIdentifier(value.to_string()))
}

/// Converts a BSON value into plain JSON.
///
/// ObjectIds are rendered as hex strings and datetimes as RFC 3339 strings. All other
/// values use the relaxed extended JSON representation, which maps numbers, strings,
/// booleans and null to their natural JSON counterparts.
pub fn to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(datetime) => datetime
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Bson::DateTime(datetime).into_relaxed_extjson()),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect::<Map<_, _>>(),
        ),
        Bson::Array(array) => Value::Array(
            array
                .into_iter()
                .map(to_json)
                .collect(),
        ),
        other => other.into_relaxed_extjson(),
    }
}

/// Converts a plain JSON value into BSON.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`] if the value has no BSON representation
/// (for example an unsigned integer larger than `i64::MAX`).
pub fn from_json(value: Value) -> DocumentStoreResult<Bson> {
    Ok(serialize_to_bson(&value)?)
}

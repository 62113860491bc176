//! Entity endpoints
//!
//! Each handler resolves the collection named by the request and runs one datastore
//! operation against it.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use entilayer_core::{
    document::{from_json, to_json},
    error::DocumentStoreError,
    query::{Projection, Query as EntityQuery},
};

use crate::error::ApiError;
use crate::extractors::JsonBody;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;

/// Create entity request
#[derive(Deserialize)]
pub struct CreateEntityRequest {
    #[serde(rename = "entityType", default)]
    pub entity_type: Option<String>,
    /// `null`, `false`, `0` and `""` count as missing
    #[serde(default)]
    pub data: Option<Value>,
}

/// Update entity request
#[derive(Deserialize)]
pub struct UpdateEntityRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

/// Create/update response
#[derive(Serialize)]
pub struct EntityResponse {
    pub message: &'static str,
    pub entity: Value,
}

/// Query string of the filtered list
#[derive(Deserialize, Default)]
pub struct SearchParams {
    #[serde(rename = "entityType")]
    pub entity_type: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    /// Comma separated projection, e.g. `data.name,-_id`
    pub fields: Option<String>,
    /// JSON encoded filter document
    pub query: Option<String>,
}

fn documents_to_json(documents: Vec<Bson>) -> Value {
    Value::Array(documents.into_iter().map(to_json).collect())
}

fn present(entity_type: Option<String>) -> Option<String> {
    entity_type.filter(|name| !name.is_empty())
}

/// JavaScript truthiness: everything except `false`, zero, NaN and the empty string.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// POST /entities - create an entity
async fn create_entity(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateEntityRequest>,
) -> Result<(StatusCode, Json<EntityResponse>), ApiError> {
    let (Some(entity_type), Some(data)) = (present(req.entity_type), req.data.filter(is_truthy)) else {
        return Err(ApiError::bad_request("Entity type and data are required"));
    };

    let collection = state.registry().resolve(&entity_type).await;
    let data = from_json(data).map_err(|err| ApiError::invalid("Error creating entity", err))?;
    let entity = collection
        .insert(data)
        .await
        .map_err(|err| ApiError::invalid("Error creating entity", err))?;

    tracing::debug!(entity_type = %entity_type, id = %entity.id(), "Entity created");

    Ok((
        StatusCode::CREATED,
        Json(EntityResponse {
            message: "Entity created successfully",
            entity: entity.to_json(),
        }),
    ))
}

/// GET /entities/{entity_type} - list every entity of a type
async fn list_entities(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let documents = state
        .registry()
        .resolve(&entity_type)
        .await
        .find_all()
        .await
        .map_err(|err| ApiError::internal("Error listing entities", err))?;

    if documents.is_empty() {
        return Err(ApiError::not_found(format!("No entities of type {entity_type} found")));
    }

    Ok(Json(documents_to_json(documents)))
}

/// GET /entities/{entity_type}/{id} - fetch one entity
async fn get_entity(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state
        .registry()
        .resolve(&entity_type)
        .await
        .find_by_id(&id)
        .await
        .map_err(|err| ApiError::internal("Error fetching entity", err))?
        .map(|document| Json(to_json(document)))
        .ok_or_else(|| ApiError::not_found("Entity not found"))
}

/// PUT /entities/{entity_type}/{id} - replace an entity's data
async fn update_entity(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
    JsonBody(req): JsonBody<UpdateEntityRequest>,
) -> Result<Json<EntityResponse>, ApiError> {
    let Some(data) = req.data else {
        return Err(ApiError::bad_request("Data is required"));
    };

    let collection = state.registry().resolve(&entity_type).await;
    let data = from_json(data).map_err(|err| ApiError::internal("Error updating entity", err))?;
    let updated = collection
        .update_data(&id, data)
        .await
        .map_err(|err| ApiError::internal("Error updating entity", err))?
        .ok_or_else(|| ApiError::not_found("Entity not found"))?;

    Ok(Json(EntityResponse {
        message: "Entity updated successfully",
        entity: to_json(updated),
    }))
}

/// GET /entities?entityType=... - filtered, paginated list
async fn search_entities(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::invalid("Invalid query", rejection.body_text()))?;

    let Some(entity_type) = present(params.entity_type) else {
        return Err(ApiError::bad_request("Entity type is required"));
    };

    let collection = state.registry().resolve(&entity_type).await;

    let mut query = EntityQuery::builder()
        .limit(page_limit(params.limit.as_deref()))
        .offset(page_skip(params.skip.as_deref())?);

    if let Some(filter) = params.query.as_deref().filter(|raw| !raw.is_empty()) {
        query = query.filter(parse_filter(filter)?);
    }
    if let Some(fields) = params.fields.as_deref() {
        query = query.projection(
            Projection::parse(fields).map_err(|err| ApiError::invalid("Invalid query", err))?,
        );
    }

    let documents = collection
        .find(query.build())
        .await
        .map_err(|err| match err {
            DocumentStoreError::InvalidQuery(_) => ApiError::invalid("Invalid query", err),
            _ => ApiError::internal("Error searching entities", err),
        })?;

    Ok(Json(documents_to_json(documents)))
}

/// Decodes the `query` parameter, which must be a JSON object.
fn parse_filter(raw: &str) -> Result<Document, ApiError> {
    let value = serde_json::from_str::<Value>(raw).map_err(|err| ApiError::invalid("Invalid query", err))?;

    if !value.is_object() {
        return Err(ApiError::invalid("Invalid query", "query must be a JSON object"));
    }

    match from_json(value).map_err(|err| ApiError::invalid("Invalid query", err))? {
        Bson::Document(filter) => Ok(filter),
        _ => Err(ApiError::invalid("Invalid query", "query must be a JSON object")),
    }
}

/// Missing, unparsable and zero limits use the default; a negative limit counts from zero.
fn page_limit(raw: Option<&str>) -> usize {
    parse_int(raw)
        .filter(|limit| *limit != 0)
        .map(|limit| limit.unsigned_abs() as usize)
        .unwrap_or(DEFAULT_LIMIT)
}

fn page_skip(raw: Option<&str>) -> Result<usize, ApiError> {
    match parse_int(raw) {
        Some(skip) if skip < 0 => Err(ApiError::invalid("Invalid query", "skip must not be negative")),
        Some(skip) => Ok(skip as usize),
        None => Ok(0),
    }
}

/// Lenient integer parsing: leading whitespace, an optional sign, an optional `0x` prefix,
/// then as many digits as there are. Trailing text is ignored.
fn parse_int(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim_start();

    let (negative, unsigned) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x" | "0X") => (16, &unsigned[2..]),
        _ => (10, unsigned),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());

    let value = i64::from_str_radix(&digits[..end], radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Entity routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/entities", post(create_entity).get(search_entities))
        .route("/entities/{entity_type}", get(list_entities))
        .route("/entities/{entity_type}/{id}", get(get_entity).put(update_entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_reads_leading_digits() {
        assert_eq!(parse_int(Some("42")), Some(42));
        assert_eq!(parse_int(Some("  7 items")), Some(7));
        assert_eq!(parse_int(Some("-3")), Some(-3));
        assert_eq!(parse_int(Some("+5")), Some(5));
        assert_eq!(parse_int(Some("0x1f")), Some(31));
        assert_eq!(parse_int(Some("2.9")), Some(2));
    }

    #[test]
    fn parse_int_rejects_non_numbers() {
        assert_eq!(parse_int(None), None);
        assert_eq!(parse_int(Some("")), None);
        assert_eq!(parse_int(Some("ten")), None);
        assert_eq!(parse_int(Some("-")), None);
    }

    #[test]
    fn limit_defaults_and_absolute_values() {
        assert_eq!(page_limit(None), DEFAULT_LIMIT);
        assert_eq!(page_limit(Some("0")), DEFAULT_LIMIT);
        assert_eq!(page_limit(Some("abc")), DEFAULT_LIMIT);
        assert_eq!(page_limit(Some("25")), 25);
        assert_eq!(page_limit(Some("-4")), 4);
    }

    #[test]
    fn skip_rejects_negative_values() {
        assert_eq!(page_skip(None).unwrap(), 0);
        assert_eq!(page_skip(Some("x")).unwrap(), 0);
        assert_eq!(page_skip(Some("3")).unwrap(), 3);
        assert!(page_skip(Some("-1")).is_err());
    }

    #[test]
    fn truthiness_follows_javascript() {
        use serde_json::json;

        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(-0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-2.5), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn filter_must_be_an_object() {
        assert!(parse_filter(r#"{"data.status":"done"}"#).is_ok());
        assert!(parse_filter("[1, 2]").is_err());
        assert!(parse_filter("{invalid}").is_err());
    }
}

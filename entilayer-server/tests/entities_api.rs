use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use entilayer_core::store::DocumentStore;
use entilayer_memory::InMemoryStore;
use entilayer_server::{build_router, AppState};

fn app() -> Router {
    build_router(AppState::from_store(DocumentStore::new(InMemoryStore::new())))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };

    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn create(app: &Router, entity_type: &str, data: Value) -> Value {
    let (status, body) = send_json(app, "POST", "/entities", json!({ "entityType": entity_type, "data": data })).await;
    assert_eq!(status, StatusCode::CREATED);

    body["entity"].clone()
}

#[tokio::test]
async fn created_entity_can_be_fetched() {
    let app = app();
    let data = json!({ "title": "write docs", "points": 3, "tags": ["docs"], "done": false });

    let (status, body) = send_json(&app, "POST", "/entities", json!({ "entityType": "tasks", "data": data })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Entity created successfully");

    let id = body["entity"]["_id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 24);
    assert_eq!(body["entity"]["data"], data);

    let (status, fetched) = get(&app, &format!("/entities/tasks/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["_id"], id.as_str());
    assert_eq!(fetched["data"], data);
}

#[tokio::test]
async fn repeated_creates_share_one_collection() {
    let app = app();

    for n in 0..3 {
        create(&app, "notes", json!({ "n": n })).await;
    }

    let (status, list) = get(&app, "/entities/notes").await;
    assert_eq!(status, StatusCode::OK);

    let numbers = list
        .as_array()
        .unwrap()
        .iter()
        .map(|entity| entity["data"]["n"].as_i64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec![0, 1, 2]);

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["entityTypes"], 1);
}

#[tokio::test]
async fn entity_types_are_isolated() {
    let app = app();
    create(&app, "cats", json!("tom")).await;

    let (status, body) = get(&app, "/entities/dogs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No entities of type dogs found");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let app = app();
    create(&app, "tasks", json!({ "title": "a" })).await;

    let (status, body) = get(&app, "/entities/tasks/65f0a1b2c3d4e5f6a7b8c9d0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Entity not found");
}

#[tokio::test]
async fn malformed_id_is_a_server_error() {
    let app = app();

    let (status, body) = get(&app, "/entities/tasks/not-an-id").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error fetching entity");
    assert!(body["error"].as_str().unwrap().contains("not-an-id"));
}

#[tokio::test]
async fn update_replaces_data_and_keeps_id() {
    let app = app();
    let entity = create(&app, "tasks", json!({ "status": "open" })).await;
    let id = entity["_id"].as_str().unwrap();
    let uri = format!("/entities/tasks/{id}");

    let (status, body) = send_json(&app, "PUT", &uri, json!({ "data": { "status": "done" } })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Entity updated successfully");
    assert_eq!(body["entity"]["_id"], id);
    assert_eq!(body["entity"]["data"], json!({ "status": "done" }));

    let (status, fetched) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["_id"], id);
    assert_eq!(fetched["data"], json!({ "status": "done" }));
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let app = app();

    let (status, body) = send_json(
        &app,
        "PUT",
        "/entities/tasks/65f0a1b2c3d4e5f6a7b8c9d0",
        json!({ "data": 1 }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Entity not found");
}

#[tokio::test]
async fn update_without_data_is_rejected() {
    let app = app();
    let entity = create(&app, "tasks", json!({ "status": "open" })).await;
    let uri = format!("/entities/tasks/{}", entity["_id"].as_str().unwrap());

    let (status, body) = send_json(&app, "PUT", &uri, json!({ "data": null })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Data is required");

    let (_, fetched) = get(&app, &uri).await;
    assert_eq!(fetched["data"], json!({ "status": "open" }));
}

#[tokio::test]
async fn create_without_data_creates_nothing() {
    let app = app();

    let bodies = [
        json!({ "entityType": "tasks" }),
        json!({ "entityType": "tasks", "data": null }),
        json!({ "entityType": "tasks", "data": 0 }),
        json!({ "entityType": "tasks", "data": false }),
        json!({ "entityType": "tasks", "data": "" }),
        json!({ "data": 1 }),
        json!({ "entityType": "", "data": 1 }),
    ];

    for body in bodies {
        let (status, response) = send_json(&app, "POST", "/entities", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Entity type and data are required");
    }

    let (status, _) = get(&app, "/entities/tasks").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_accepts_falsy_data() {
    let app = app();
    let entity = create(&app, "flags", json!({ "on": true })).await;
    let uri = format!("/entities/flags/{}", entity["_id"].as_str().unwrap());

    let (status, body) = send_json(&app, "PUT", &uri, json!({ "data": false })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entity"]["data"], json!(false));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = app();

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/entities")
            .header("content-type", "application/json")
            .body(Body::from("{\"entityType\": "))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");
    assert!(body["error"].is_string());
}

async fn seed_numbers(app: &Router, count: i64) {
    for n in 1..=count {
        create(app, "items", json!({ "n": n, "status": if n % 2 == 0 { "done" } else { "open" } })).await;
    }
}

fn numbers(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|entity| entity["data"]["n"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn limit_and_skip_paginate() {
    let app = app();
    seed_numbers(&app, 5).await;

    let (status, list) = get(&app, "/entities?entityType=items&limit=2&skip=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(numbers(&list), vec![2, 3]);
}

#[tokio::test]
async fn pagination_defaults_are_lenient() {
    let app = app();
    seed_numbers(&app, 12).await;

    let (_, list) = get(&app, "/entities?entityType=items").await;
    assert_eq!(numbers(&list), (1..=10).collect::<Vec<_>>());

    let (_, list) = get(&app, "/entities?entityType=items&limit=0&skip=abc").await;
    assert_eq!(numbers(&list).len(), 10);

    let (_, list) = get(&app, "/entities?entityType=items&limit=-3").await;
    assert_eq!(numbers(&list), vec![1, 2, 3]);

    let (_, list) = get(&app, "/entities?entityType=items&limit=2items&skip=11").await;
    assert_eq!(numbers(&list), vec![12]);

    let (status, _) = get(&app, "/entities?entityType=items&skip=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn filter_selects_matching_entities() {
    let app = app();
    seed_numbers(&app, 5).await;

    let uri = format!("/entities?entityType=items&query={}", urlencoding::encode(r#"{"data.status":"done"}"#));
    let (status, list) = get(&app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(numbers(&list), vec![2, 4]);

    let uri = format!("/entities?entityType=items&query={}", urlencoding::encode(r#"{"data.n":{"$gt":3}}"#));
    let (_, list) = get(&app, &uri).await;
    assert_eq!(numbers(&list), vec![4, 5]);
}

#[tokio::test]
async fn filter_matches_identifiers() {
    let app = app();
    create(&app, "items", json!({ "n": 1 })).await;
    let second = create(&app, "items", json!({ "n": 2 })).await;

    let filter = json!({ "_id": second["_id"] }).to_string();
    let uri = format!("/entities?entityType=items&query={}", urlencoding::encode(&filter));
    let (_, list) = get(&app, &uri).await;

    assert_eq!(numbers(&list), vec![2]);
}

#[tokio::test]
async fn malformed_filter_is_rejected() {
    let app = app();
    seed_numbers(&app, 2).await;

    for raw in ["{invalid}", "[1,2]", "\"done\""] {
        let uri = format!("/entities?entityType=items&query={}", urlencoding::encode(raw));
        let (status, body) = get(&app, &uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid query");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn filtered_list_of_empty_type_is_empty() {
    let app = app();

    let (status, list) = get(&app, "/entities?entityType=ghosts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn missing_entity_type_is_rejected() {
    let app = app();

    for uri in ["/entities", "/entities?entityType=", "/entities?limit=2"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Entity type is required");
    }
}

#[tokio::test]
async fn fields_project_results() {
    let app = app();
    create(&app, "users", json!({ "name": "ada", "age": 36 })).await;

    let uri = format!("/entities?entityType=users&fields={}", urlencoding::encode("data.name,-_id"));
    let (status, list) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([{ "data": { "name": "ada" } }]));

    let (_, list) = get(&app, "/entities?entityType=users&fields=-data").await;
    let entity = &list.as_array().unwrap()[0];
    assert!(entity.get("data").is_none());
    assert!(entity["_id"].is_string());

    let uri = format!("/entities?entityType=users&fields={}", urlencoding::encode("data.name,-data.age"));
    let (status, _) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_datastore_status() {
    let app = app();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["datastore"], "up");
    assert_eq!(body["entityTypes"], 0);
    assert!(body["version"].is_string());
}

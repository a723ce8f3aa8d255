//! End-to-end tests through the HTTP router.

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION, header::LOCATION};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use resource_framework::PermissionGate;
use resource_service::api::{self, Authenticator};
use resource_service::config::ServerConfig;
use resource_service::lifecycle::ResourceSystem;
use serde_json::{Value, json};

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";
const ADMIN: &str = "admin-token";

fn server() -> TestServer {
    let system = ResourceSystem::new(8, PermissionGate::default());
    let auth = Authenticator::from_config(&ServerConfig::for_testing()).unwrap();
    TestServer::new(api::router(&system, auth)).expect("Failed to create test server")
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap())
}

async fn post_as(server: &TestServer, token: &str, path: &str, body: Value) -> Value {
    let (name, value) = bearer(token);
    let response = server.post(path).add_header(name, value).json(&body).await;
    assert_eq!(response.status_code(), StatusCode::CREATED, "{}", response.text());
    response.json::<Value>()
}

fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_health() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"status": "ok"}));
}

#[tokio::test]
async fn test_product_lifecycle() {
    let server = server();

    // create
    let (name, value) = bearer(ALICE);
    let response = server
        .post("/products")
        .add_header(name, value)
        .json(&json!({"title": "Desk"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.header(LOCATION), "/products/1");
    assert_eq!(
        response.json::<Value>(),
        json!({
            "id": 1,
            "url": "/products/1",
            "title": "Desk",
            "content": "Desk",
            "price": 99.99,
            "owner": {"username": "alice"},
            "sale_price": 79.99,
            "name": "Desk",
            "edit_url": "/products/1/update",
            "related_products": [{"title": "Desk", "url": "/products/1"}],
        })
    );

    // anonymous read
    let response = server.get("/products/1").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["title"], "Desk");

    // partial update keeps the other fields
    let (name, value) = bearer(ALICE);
    let response = server
        .patch("/products/1")
        .add_header(name, value)
        .json(&json!({"price": 10}))
        .await;
    response.assert_status_ok();
    let patched = response.json::<Value>();
    assert_eq!(patched["price"], json!(10.0));
    assert_eq!(patched["sale_price"], json!(8.0));
    assert_eq!(patched["content"], "Desk");

    // full replacement needs every required field
    let (name, value) = bearer(ALICE);
    let response = server
        .put("/products/1")
        .add_header(name, value)
        .json(&json!({"price": 5}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["title"]);

    // full replacement resets what it omits
    let (name, value) = bearer(ALICE);
    let response = server
        .put("/products/1")
        .add_header(name, value)
        .json(&json!({"title": "Lamp"}))
        .await;
    response.assert_status_ok();
    let replaced = response.json::<Value>();
    assert_eq!(replaced["price"], json!(99.99));
    assert_eq!(replaced["content"], "Lamp");
    assert_eq!(replaced["owner"], json!({"username": "alice"}));

    // delete
    let (name, value) = bearer(ALICE);
    let response = server.delete("/products/1").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server.get("/products/1").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({"reason": "Not found."}));
}

#[tokio::test]
async fn test_owner_rules() {
    let server = server();
    post_as(&server, ALICE, "/products", json!({"title": "Desk"})).await;

    // someone else's product
    let (name, value) = bearer(BOB);
    let response = server
        .patch("/products/1")
        .add_header(name, value)
        .json(&json!({"price": 1}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert!(response.json::<Value>()["reason"].is_string());

    // staff may edit anything
    let (name, value) = bearer(ADMIN);
    let response = server
        .patch("/products/1")
        .add_header(name, value)
        .json(&json!({"price": 1}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["owner"], json!({"username": "alice"}));
}

#[tokio::test]
async fn test_product_content_falls_back_to_title() {
    let server = server();

    let created = post_as(&server, ALICE, "/products", json!({"title": "Desk", "content": ""})).await;
    assert_eq!(created["content"], "Desk");

    let (name, value) = bearer(ALICE);
    let response = server
        .patch("/products/1")
        .add_header(name, value)
        .json(&json!({"content": ""}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["content"], "Desk");

    let (name, value) = bearer(ALICE);
    let response = server
        .patch("/products/1")
        .add_header(name, value)
        .json(&json!({"content": "Solid oak"}))
        .await;
    assert_eq!(response.json::<Value>()["content"], "Solid oak");
}

#[tokio::test]
async fn test_product_related_listing_and_edit_routes() {
    let server = server();
    post_as(&server, ALICE, "/products", json!({"title": "Desk"})).await;
    post_as(&server, BOB, "/products", json!({"title": "Chair"})).await;
    let lamp = post_as(&server, ALICE, "/products", json!({"title": "Lamp"})).await;

    // every product of the same owner, itself included
    assert_eq!(
        lamp["related_products"],
        json!([
            {"title": "Desk", "url": "/products/1"},
            {"title": "Lamp", "url": "/products/3"},
        ])
    );
    let chair = server.get("/products/2").await.json::<Value>();
    assert_eq!(chair["related_products"], json!([{"title": "Chair", "url": "/products/2"}]));
    assert_eq!(chair["owner"], json!({"username": "bob"}));

    // edit_url accepts updates, and the delete alias removes the record
    let edit_url = lamp["edit_url"].as_str().unwrap().to_string();
    let (name, value) = bearer(ALICE);
    let response = server
        .patch(&edit_url)
        .add_header(name, value)
        .json(&json!({"price": 12.5}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["price"], json!(12.5));

    let (name, value) = bearer(ALICE);
    let response = server.delete("/products/3/delete").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let desk = server.get("/products/1").await.json::<Value>();
    assert_eq!(desk["related_products"], json!([{"title": "Desk", "url": "/products/1"}]));
}

#[tokio::test]
async fn test_authentication_failures() {
    let server = server();

    // anonymous write
    let response = server.post("/products").json(&json!({"title": "Desk"})).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    // unknown token, even for a read
    let (name, value) = bearer("stolen");
    let response = server.get("/products").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>(), json!({"reason": "Invalid token."}));

    // ordinary callers cannot write kinds without an owner
    let (name, value) = bearer(ALICE);
    let response = server
        .post("/departments")
        .add_header(name, value)
        .json(&json!({"name": "Sales"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_validation_and_duplicates() {
    let server = server();
    post_as(&server, ALICE, "/products", json!({"title": "Desk"})).await;

    let (name, value) = bearer(ALICE);
    let response = server
        .post("/products")
        .add_header(name, value)
        .json(&json!({"title": "Hello desk", "price": -1}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let mut fields = error_fields(&response.json::<Value>());
    fields.sort();
    assert_eq!(fields, vec!["price", "title"]);

    let (name, value) = bearer(BOB);
    let response = server
        .post("/products")
        .add_header(name, value)
        .json(&json!({"title": "DESK"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["title"]);

    // more than two decimal places
    let (name, value) = bearer(BOB);
    let response = server
        .post("/products")
        .add_header(name, value)
        .json(&json!({"title": "Chair", "price": 19.999}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["price"]);

    // nothing was stored by the failed attempts
    let response = server.get("/products").await;
    assert_eq!(response.json::<Vec<Value>>().len(), 1);
}

#[tokio::test]
async fn test_malformed_requests() {
    let server = server();

    let (name, value) = bearer(ALICE);
    let response = server
        .post("/products")
        .add_header(name, value)
        .text("{\"title\": ")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["reason"].is_string());

    assert_eq!(server.get("/products/abc").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/widgets").await.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/products").add_query_param("colour", "red").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["colour"]);
}

#[tokio::test]
async fn test_list_search_ordering_and_window() {
    let server = server();
    for (title, price) in [("Oak desk", 300), ("Lamp", 20), ("Pine desk", 150)] {
        post_as(&server, ALICE, "/products", json!({"title": title, "price": price})).await;
    }

    let titles = |items: Vec<Value>| -> Vec<String> {
        items
            .iter()
            .filter_map(|p| p["title"].as_str().map(str::to_string))
            .collect()
    };

    let found = server.get("/products").add_query_param("q", "DESK").await;
    assert_eq!(titles(found.json()), vec!["Oak desk", "Pine desk"]);

    let sorted = server.get("/products").add_query_param("ordering", "-price").await;
    assert_eq!(titles(sorted.json()), vec!["Oak desk", "Pine desk", "Lamp"]);

    let page = server
        .get("/products")
        .add_query_param("ordering", "price")
        .add_query_param("offset", "1")
        .add_query_param("limit", "1")
        .await;
    assert_eq!(titles(page.json()), vec!["Pine desk"]);
}

#[tokio::test]
async fn test_employee_references_and_cascade() {
    let server = server();
    post_as(&server, ADMIN, "/departments", json!({"name": "Sales"})).await;

    let (name, value) = bearer(ADMIN);
    let response = server
        .post("/employees")
        .add_header(name, value)
        .json(&json!({"name": "Ann", "email": "ann@example.com", "department": 9}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["department"]);

    let (name, value) = bearer(ADMIN);
    let response = server
        .post("/employees")
        .add_header(name, value)
        .json(&json!({"name": "Ann", "email": "not-an-email", "department": 1}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["email"]);

    // type errors, rule failures and missing fields come back together
    let (name, value) = bearer(ADMIN);
    let response = server
        .post("/employees")
        .add_header(name, value)
        .json(&json!({"email": "not-an-email", "department": "sales"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let mut fields = error_fields(&response.json::<Value>());
    fields.sort();
    assert_eq!(fields, vec!["department", "email", "name"]);

    let ann = post_as(
        &server,
        ADMIN,
        "/employees",
        json!({"name": "Ann", "email": "ann@example.com", "department": 1}),
    )
    .await;
    assert_eq!(ann["department"], json!({"id": 1, "url": "/departments/1"}));

    let by_department = server.get("/employees").add_query_param("department", "1").await;
    assert_eq!(by_department.json::<Vec<Value>>().len(), 1);

    let (name, value) = bearer(ADMIN);
    let response = server.delete("/departments/1").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let left = server.get("/employees").await;
    assert!(left.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn test_poll_cascades() {
    let server = server();
    let now = Utc::now();

    let question = post_as(
        &server,
        ADMIN,
        "/questions",
        json!({"question_text": "What's new?", "pub_date": now.to_rfc3339()}),
    )
    .await;
    assert_eq!(question["was_published_recently"], true);

    let old = post_as(
        &server,
        ADMIN,
        "/questions",
        json!({"question_text": "What's old?", "pub_date": (now - Duration::days(3)).to_rfc3339()}),
    )
    .await;
    assert_eq!(old["was_published_recently"], false);

    for text in ["Not much", "The sky"] {
        let choice = post_as(
            &server,
            ADMIN,
            "/choices",
            json!({"question": 1, "choice_text": text}),
        )
        .await;
        assert_eq!(choice["votes"], 0);
    }
    post_as(&server, ADMIN, "/marks", json!({"question": 2})).await;

    // deleting one of two choices keeps the question
    let (name, value) = bearer(ADMIN);
    server.delete("/choices/1").add_header(name, value).await;
    server.get("/questions/1").await.assert_status_ok();

    // deleting the last one removes it
    let (name, value) = bearer(ADMIN);
    server.delete("/choices/2").add_header(name, value).await;
    assert_eq!(server.get("/questions/1").await.status_code(), StatusCode::NOT_FOUND);

    // deleting a question removes its marks
    let (name, value) = bearer(ADMIN);
    server.delete("/questions/2").add_header(name, value).await;
    assert!(server.get("/marks").await.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn test_marks_cross_field_check() {
    let server = server();
    post_as(
        &server,
        ADMIN,
        "/questions",
        json!({"question_text": "Q", "pub_date": Utc::now().to_rfc3339()}),
    )
    .await;

    let marks = post_as(&server, ADMIN, "/marks", json!({"question": 1})).await;
    assert_eq!(marks["total_marks"], 100);
    assert_eq!(marks["pass_marks"], 40);

    let (name, value) = bearer(ADMIN);
    let response = server
        .patch("/marks/1")
        .add_header(name, value)
        .json(&json!({"pass_marks": 120}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json::<Value>()), vec!["non_field_errors"]);
}

#[tokio::test]
async fn test_shutdown_after_router_is_dropped() {
    let system = ResourceSystem::new(4, PermissionGate::default());
    let app = api::router(&system, Authenticator::default());
    drop(app);
    system.shutdown().await.unwrap();
}

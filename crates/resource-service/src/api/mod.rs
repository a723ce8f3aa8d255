//! # HTTP Surface
//!
//! One route group per record kind, all served by the same generic handlers:
//!
//! | Verb | Path | Success |
//! |------|------|---------|
//! | GET | `/{kind}` | 200, list |
//! | POST | `/{kind}` | 201 + `Location` |
//! | GET | `/{kind}/{id}` | 200 |
//! | PUT | `/{kind}/{id}` | 200 |
//! | PATCH | `/{kind}/{id}` | 200 |
//! | DELETE | `/{kind}/{id}` | 204 |
//! | PUT, PATCH | `/{kind}/{id}/update` | 200 |
//! | DELETE | `/{kind}/{id}/delete` | 204 |
//! | GET | `/health` | 200 |
//!
//! Failures are mapped by [`ApiError`].

pub mod auth;
pub mod error;

pub use auth::{Authenticator, CurrentCaller};
pub use error::{ApiError, ApiResult};

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, put},
};
use resource_framework::{Payload, RecordId, Resource, ResourceHandler};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::lifecycle::ResourceSystem;

/// Builds the full application router.
pub fn router(system: &ResourceSystem, auth: Authenticator) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(resource_routes(system.products.clone()))
        .merge(resource_routes(system.departments.clone()))
        .merge(resource_routes(system.employees.clone()))
        .merge(resource_routes(system.questions.clone()))
        .merge(resource_routes(system.choices.clone()))
        .merge(resource_routes(system.marks.clone()))
        .fallback(|| async { ApiError::NotFound })
        .layer(Extension(Arc::new(auth)))
        .layer(TraceLayer::new_for_http())
}

/// The collection and item routes of one kind.
pub fn resource_routes<T: Resource>(handler: ResourceHandler<T>) -> Router {
    let collection = format!("/{}", T::KIND);
    let item = format!("/{}/{{id}}", T::KIND);
    Router::new()
        .route(&collection, get(list::<T>).post(create::<T>))
        .route(
            &item,
            get(retrieve::<T>)
                .put(replace::<T>)
                .patch(patch::<T>)
                .delete(destroy::<T>),
        )
        .route(&format!("{item}/update"), put(replace::<T>).patch(patch::<T>))
        .route(&format!("{item}/delete"), delete(destroy::<T>))
        .with_state(handler)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ids are positive integers; anything else names no record.
fn parse_id(raw: &str) -> ApiResult<RecordId> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<Payload> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn list<T: Resource>(
    State(handler): State<ResourceHandler<T>>,
    caller: CurrentCaller,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Json<Vec<Payload>>> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(Json(handler.list(caller.caller(), &params).await?))
}

async fn create<T: Resource>(
    State(handler): State<ResourceHandler<T>>,
    caller: CurrentCaller,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload = body(payload)?;
    let created = handler.create(caller.caller(), &payload).await?;
    let location = created
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    ))
}

async fn retrieve<T: Resource>(
    State(handler): State<ResourceHandler<T>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
) -> ApiResult<Json<Payload>> {
    let id = parse_id(&id)?;
    Ok(Json(handler.retrieve(caller.caller(), id).await?))
}

async fn replace<T: Resource>(
    State(handler): State<ResourceHandler<T>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Payload>> {
    let id = parse_id(&id)?;
    let payload = body(payload)?;
    Ok(Json(handler.replace(caller.caller(), id, &payload).await?))
}

async fn patch<T: Resource>(
    State(handler): State<ResourceHandler<T>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Payload>> {
    let id = parse_id(&id)?;
    let payload = body(payload)?;
    Ok(Json(handler.patch(caller.caller(), id, &payload).await?))
}

async fn destroy<T: Resource>(
    State(handler): State<ResourceHandler<T>>,
    caller: CurrentCaller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    handler.delete(caller.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! HTTP surface: one route, three methods, permissive CORS.
//!
//! `GET /` returns the whole document and `POST /` replaces it. `PUT /`
//! swaps a single top-level section. Everything else on the route answers
//! 405 with a failure envelope.

use crate::document::{Ack, Document, SectionPatch};
use crate::error::Error;
use crate::store::DocStore;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

/// Build the application router around a store.
pub fn router(store: Arc<DocStore>) -> Router {
    Router::new()
        .route(
            "/",
            get(read_document)
                .post(replace_document)
                .put(update_section)
                .fallback(method_not_allowed),
        )
        .layer(middleware::from_fn(cors))
        .with_state(store)
}

/// Stamp permissive CORS headers on every response, errors included.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn read_document(State(store): State<Arc<DocStore>>) -> Response {
    match store.read() {
        Ok(doc) => {
            tracing::debug!("served document");
            Json(doc).into_response()
        }
        Err(err) => store_failure("read", &err),
    }
}

async fn replace_document(State(store): State<Arc<DocStore>>, body: Bytes) -> Response {
    let Some(doc) = parse_replace_body(&body) else {
        tracing::warn!("rejected replace: body missing, unparseable, or empty");
        return rejected("Invalid data");
    };
    match store.replace(doc) {
        Ok(()) => {
            tracing::info!("document replaced");
            Json(Ack::ok("document saved successfully")).into_response()
        }
        Err(err) => store_failure("replace", &err),
    }
}

/// The replace body must be a JSON object with at least one member.
/// Scalars, arrays, `null`, and `{}` are all rejected.
fn parse_replace_body(body: &[u8]) -> Option<Document> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match &value {
        Value::Object(map) if !map.is_empty() => serde_json::from_value(value).ok(),
        _ => None,
    }
}

async fn update_section(State(store): State<Arc<DocStore>>, body: Bytes) -> Response {
    let Ok(patch) = serde_json::from_slice::<SectionPatch>(&body) else {
        tracing::warn!("rejected update: body unparseable or section missing");
        return rejected("Invalid update data");
    };
    match store.update_section(&patch.section, patch.value) {
        Ok(_) => {
            tracing::info!(section = %patch.section, "section updated");
            Json(Ack::ok("section updated successfully")).into_response()
        }
        // A value that doesn't fit the typed section is the caller's fault.
        Err(Error::Deserialize(msg)) => {
            tracing::warn!(section = %patch.section, "rejected update: {msg}");
            rejected("Invalid update data")
        }
        Err(err) => store_failure("update", &err),
    }
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(Ack::fail("Method not allowed")),
    )
        .into_response()
}

fn rejected(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(Ack::fail(message))).into_response()
}

fn store_failure(op: &str, err: &Error) -> Response {
    tracing::error!("store {op} failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Ack::fail("Storage failure")),
    )
        .into_response()
}

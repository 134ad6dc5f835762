#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use resource_controllers::{Filter, InMemoryModel, ResourceModel};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// In-memory `User` model that counts every persistence call.
pub struct CountingModel {
    inner: InMemoryModel,
    calls: AtomicUsize,
    refuse_create: bool,
    forget_records: bool,
}

impl CountingModel {
    pub fn new() -> Self {
        Self {
            inner: InMemoryModel::new("User").with_fields(["name", "email"]),
            calls: AtomicUsize::new(0),
            refuse_create: false,
            forget_records: false,
        }
    }

    /// `create` answers `Ok(None)`, as a persistence layer that declined the write.
    pub fn refusing_create() -> Self {
        Self {
            refuse_create: true,
            ..Self::new()
        }
    }

    /// Writes succeed but `find_by_pk` never finds anything.
    pub fn forgetful() -> Self {
        Self {
            forget_records: true,
            ..Self::new()
        }
    }

    pub async fn seeded() -> Arc<Self> {
        let model = Self::new();
        model
            .inner
            .seed([
                json!({"name": "x", "email": "x@example.com"}),
                json!({"name": "y", "email": "y@example.com"}),
                json!({"name": "x", "email": "x2@example.com"}),
            ])
            .await
            .unwrap();
        Arc::new(model)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceModel for CountingModel {
    fn resource_name(&self) -> &str {
        self.inner.resource_name()
    }

    fn build(&self) -> JsonValue {
        self.inner.build()
    }

    async fn find_all(&self, filter: &Filter) -> anyhow::Result<Vec<JsonValue>> {
        self.hit();
        self.inner.find_all(filter).await
    }

    async fn find_by_pk(&self, id: i64) -> anyhow::Result<Option<JsonValue>> {
        self.hit();
        if self.forget_records {
            return Ok(None);
        }
        self.inner.find_by_pk(id).await
    }

    async fn create(&self, attributes: JsonValue) -> anyhow::Result<Option<JsonValue>> {
        self.hit();
        if self.refuse_create {
            return Ok(None);
        }
        self.inner.create(attributes).await
    }

    async fn upsert(&self, attributes: JsonValue) -> anyhow::Result<bool> {
        self.hit();
        self.inner.upsert(attributes).await
    }

    async fn destroy(&self, record: &JsonValue) -> anyhow::Result<()> {
        self.hit();
        self.inner.destroy(record).await
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> JsonValue {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get("location")
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    Reply {
        status,
        location,
        body,
    }
}

pub fn json_request(method: &str, uri: &str, body: Option<JsonValue>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("accept", "application/json");
    match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn html_request(method: &str, uri: &str, form: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("accept", "text/html,application/xhtml+xml;q=0.9");
    match form {
        Some(f) => builder
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(f.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

//! JSON resource controller: CRUD actions that read and write structured data.

use crate::app::action_map::ActionMap;
use crate::app::controller::{Controller, Operations, Resource};
use crate::domain::model::{Filter, ResourceModel};
use crate::transport::http::error::HttpError;
use crate::transport::http::gates::{AcceptGate, MediaFlavor, SharedGate};
use crate::transport::http::handlers::common::{
    bind, delete_target, list_filter, missing_target, not_found_by_id, resource_attributes,
    upsert_target,
};
use crate::transport::http::types::ActionRequest;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value as JsonValue;
use std::sync::Arc;

struct JsonHandlers {
    resource: Resource,
}

impl JsonHandlers {
    async fn list(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let filter = list_filter(&self.resource, &req.body);
        let models = self.resource.model().find_all(&filter).await?;
        Ok(Json(models).into_response())
    }

    async fn read(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let model = match req.id {
            Some(id) => self.resource.model().find_by_pk(id).await?,
            None => None,
        };
        match model {
            Some(model) => Ok(Json(model).into_response()),
            None => Err(not_found_by_id(req.id)),
        }
    }

    async fn create(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let attrs = resource_attributes(&self.resource, &req.body)?;
        let created = self
            .resource
            .model()
            .create(JsonValue::Object(attrs))
            .await?;
        Ok(Json(created).into_response())
    }

    async fn update(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let (attrs, target) = upsert_target(&self.resource, &req)?;
        let model = self.resource.model();
        model.upsert(attrs).await?;

        let updated = match target {
            Some(id) => model.find_by_pk(id).await?,
            None => None,
        };
        match updated {
            Some(record) => Ok(Json(record).into_response()),
            None => Err(missing_target(&self.resource, target, "update")),
        }
    }

    async fn delete(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let target = delete_target(&self.resource, &req);
        let model = self.resource.model();
        let record = match target {
            Some(id) => model.find_by_pk(id).await?,
            None => None,
        };
        let Some(record) = record else {
            return Err(missing_target(&self.resource, target, "delete"));
        };

        model.destroy(&record).await?;
        let remaining = model.find_all(&Filter::new()).await?;
        Ok(Json(remaining).into_response())
    }
}

/// Serves a resource as JSON under `/api/<resource>` by default.
///
/// On top of the default action map it routes `update` (PUT, POST) and `delete`
/// (POST, DELETE) without an id, for clients that send the id in the body.
pub struct JsonResourceController {
    controller: Controller,
}

impl JsonResourceController {
    pub const DEFAULT_PREFIX: &'static str = "/api";

    pub fn new(model: Arc<dyn ResourceModel>, gates: &[SharedGate]) -> Self {
        Self::with_prefix(model, gates, Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(model: Arc<dyn ResourceModel>, gates: &[SharedGate], prefix: &str) -> Self {
        let resource = Resource::new(model);
        let handlers = Arc::new(JsonHandlers {
            resource: resource.clone(),
        });

        let operations = Operations {
            list: bind("list", &handlers, |h, req| async move { h.list(req).await }),
            read: bind("read", &handlers, |h, req| async move { h.read(req).await }),
            create: bind("create", &handlers, |h, req| async move { h.create(req).await }),
            update: bind("update", &handlers, |h, req| async move { h.update(req).await }),
            delete: bind("delete", &handlers, |h, req| async move { h.delete(req).await }),
        };
        let delta = ActionMap::new()
            .route("delete", &[Method::POST, Method::DELETE], &operations.delete)
            .route("update", &[Method::PUT, Method::POST], &operations.update);

        Self {
            controller: Controller::specialize(
                resource,
                gates,
                AcceptGate::shared(MediaFlavor::Json),
                prefix,
                &operations,
                delta,
            ),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn base(&self) -> String {
        self.controller.base()
    }

    pub fn action_map(&self) -> &ActionMap {
        self.controller.action_map()
    }

    pub fn compile_router(&self) -> Router {
        self.controller.compile_router()
    }
}

impl AsRef<Controller> for JsonResourceController {
    fn as_ref(&self) -> &Controller {
        &self.controller
    }
}

impl From<JsonResourceController> for Controller {
    fn from(value: JsonResourceController) -> Self {
        value.controller
    }
}

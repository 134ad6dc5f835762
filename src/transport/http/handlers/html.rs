//! HTML resource controller: CRUD actions that render views.
//!
//! Views live under the resource's folder (`<resource>/index`, `<resource>/view`,
//! `<resource>/form`). The `create` and `update/:id` paths carry two actions each: GET
//! renders the form, POST/PUT performs the mutation.

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
use crate::transport::http::views::ViewRenderer;
use axum::http::header::LOCATION;
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Serialize)]
struct IndexContext<'a> {
    models: &'a [JsonValue],
}

#[derive(Serialize)]
struct ModelContext<'a> {
    model: Option<&'a JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'static str>,
}

struct HtmlHandlers {
    resource: Resource,
    renderer: Arc<dyn ViewRenderer>,
    index_url: String,
}

impl HtmlHandlers {
    fn render<C: Serialize>(&self, view: &str, context: &C) -> Result<Response, HttpError> {
        let context =
            serde_json::to_value(context).map_err(|e| HttpError::Render(e.into()))?;
        let html = self
            .renderer
            .render(&self.resource.view_path(view), &context)
            .map_err(HttpError::Render)?;
        Ok(Html(html).into_response())
    }

    async fn list(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let filter = list_filter(&self.resource, &req.body);
        let models = self.resource.model().find_all(&filter).await?;
        self.render(HtmlResourceController::INDEX, &IndexContext { models: &models })
    }

    async fn read(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let model = match req.id {
            Some(id) => self.resource.model().find_by_pk(id).await?,
            None => None,
        };
        let Some(model) = model else {
            return Err(not_found_by_id(req.id));
        };
        self.render(
            HtmlResourceController::VIEW,
            &ModelContext {
                model: Some(&model),
                method: None,
            },
        )
    }

    async fn create_form(&self, _req: ActionRequest) -> Result<Response, HttpError> {
        let blank = self.resource.model().build();
        self.render(
            HtmlResourceController::FORM,
            &ModelContext {
                model: Some(&blank),
                method: Some("POST"),
            },
        )
    }

    async fn create(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let attrs = resource_attributes(&self.resource, &req.body)?;
        let created = self
            .resource
            .model()
            .create(JsonValue::Object(attrs))
            .await?;
        if created.is_none() {
            return Err(HttpError::Internal(format!(
                "Can not create {}.",
                self.resource.name_lower()
            )));
        }
        Ok((StatusCode::FOUND, [(LOCATION, self.index_url.clone())]).into_response())
    }

    async fn edit_form(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let model = match req.id {
            Some(id) => self.resource.model().find_by_pk(id).await?,
            None => None,
        };
        self.render(
            HtmlResourceController::FORM,
            &ModelContext {
                model: model.as_ref(),
                method: Some("POST"),
            },
        )
    }

    async fn update(&self, req: ActionRequest) -> Result<Response, HttpError> {
        let (attrs, target) = upsert_target(&self.resource, &req)?;
        let model = self.resource.model();
        model.upsert(attrs).await?;

        let updated = match target {
            Some(id) => model.find_by_pk(id).await?,
            None => None,
        };
        let Some(updated) = updated else {
            return Err(missing_target(&self.resource, target, "update"));
        };
        self.render(
            HtmlResourceController::VIEW,
            &ModelContext {
                model: Some(&updated),
                method: Some("POST"),
            },
        )
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
        let models = model.find_all(&Filter::new()).await?;
        self.render(HtmlResourceController::INDEX, &IndexContext { models: &models })
    }
}

/// Serves a resource as rendered HTML under `/<resource>` by default.
pub struct HtmlResourceController {
    controller: Controller,
}

impl HtmlResourceController {
    pub const DEFAULT_PREFIX: &'static str = "";

    pub const INDEX: &'static str = "index";
    pub const VIEW: &'static str = "view";
    pub const FORM: &'static str = "form";

    pub fn new(
        model: Arc<dyn ResourceModel>,
        renderer: Arc<dyn ViewRenderer>,
        gates: &[SharedGate],
    ) -> Self {
        Self::with_prefix(model, renderer, gates, Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(
        model: Arc<dyn ResourceModel>,
        renderer: Arc<dyn ViewRenderer>,
        gates: &[SharedGate],
        prefix: &str,
    ) -> Self {
        let resource = Resource::new(model);
        let handlers = Arc::new(HtmlHandlers {
            index_url: format!("{}/{}/{}", prefix, resource.name_lower(), Self::INDEX),
            resource: resource.clone(),
            renderer,
        });

        let operations = Operations {
            list: bind("list", &handlers, |h, req| async move { h.list(req).await }),
            read: bind("read", &handlers, |h, req| async move { h.read(req).await }),
            create: bind("create", &handlers, |h, req| async move { h.create(req).await }),
            update: bind("update", &handlers, |h, req| async move { h.update(req).await }),
            delete: bind("delete", &handlers, |h, req| async move { h.delete(req).await }),
        };
        let create_form = bind("create_form", &handlers, |h, req| async move {
            h.create_form(req).await
        });
        let edit_form = bind("edit_form", &handlers, |h, req| async move {
            h.edit_form(req).await
        });
        let delta = ActionMap::new()
            .route("create", &[Method::GET], &create_form)
            .route("update/:id", &[Method::GET], &edit_form);

        Self {
            controller: Controller::specialize(
                resource,
                gates,
                AcceptGate::shared(MediaFlavor::Html),
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

impl AsRef<Controller> for HtmlResourceController {
    fn as_ref(&self) -> &Controller {
        &self.controller
    }
}

impl From<HtmlResourceController> for Controller {
    fn from(value: HtmlResourceController) -> Self {
        value.controller
    }
}

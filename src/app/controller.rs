//! Controller configuration objects.
//!
//! A [`Controller`] is plain data: the resource it serves, its mount prefix, its own
//! copy of the pre-gate list and its action map. The JSON and HTML variants are built
//! by handing [`Controller::specialize`] a set of operations, a default gate and an
//! action-map delta; they do not subclass anything.

use crate::app::action_map::{Action, ActionMap};
use crate::domain::model::ResourceModel;
use crate::transport::http::error::HttpError;
use crate::transport::http::gates::SharedGate;
use axum::http::Method;
use axum::response::IntoResponse;
use axum::Router;
use std::sync::Arc;

/// The model a controller serves, plus the names derived from it.
#[derive(Clone)]
pub struct Resource {
    model: Arc<dyn ResourceModel>,
    name: String,
    name_lower: String,
}

impl Resource {
    pub fn new(model: Arc<dyn ResourceModel>) -> Self {
        let name = model.resource_name().to_string();
        let name_lower = name.to_lowercase();
        Self {
            model,
            name,
            name_lower,
        }
    }

    pub fn model(&self) -> &dyn ResourceModel {
        self.model.as_ref()
    }

    /// Resource name as the model reports it; request bodies are keyed by it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased name used for URL and view-folder segments.
    pub fn name_lower(&self) -> &str {
        &self.name_lower
    }

    pub fn primary_key_field(&self) -> &str {
        self.model.primary_key_field()
    }

    /// `<resource>/<view>`, the path handed to the view renderer.
    pub fn view_path(&self, view: &str) -> String {
        format!("{}/{}", self.name_lower, view)
    }
}

/// The five CRUD operations an action map is built from.
#[derive(Clone, Debug)]
pub struct Operations {
    pub list: Action,
    pub read: Action,
    pub create: Action,
    pub update: Action,
    pub delete: Action,
}

impl Operations {
    /// Every operation answers `501 Not Implemented`.
    pub fn not_implemented() -> Self {
        let action = Action::new("not_implemented", |_req| async {
            HttpError::NotImplemented.into_response()
        });
        Self {
            list: action.clone(),
            read: action.clone(),
            create: action.clone(),
            update: action.clone(),
            delete: action,
        }
    }

    /// The default action map.
    ///
    /// | path          | methods                                  |
    /// |---------------|------------------------------------------|
    /// | ``            | GET → list, POST → create                |
    /// | `index`       | GET → list                               |
    /// | `create`      | POST → create                            |
    /// | `delete/:id`  | POST, DELETE → delete                    |
    /// | `update/:id`  | PUT, POST → update                       |
    /// | `:id`         | GET → read, PUT → update, DELETE → delete |
    pub fn action_map(&self) -> ActionMap {
        ActionMap::new()
            .route("", &[Method::GET], &self.list)
            .route("", &[Method::POST], &self.create)
            .route("index", &[Method::GET], &self.list)
            .route("create", &[Method::POST], &self.create)
            .route("delete/:id", &[Method::POST, Method::DELETE], &self.delete)
            .route("update/:id", &[Method::PUT, Method::POST], &self.update)
            .route(":id", &[Method::GET], &self.read)
            .route(":id", &[Method::PUT], &self.update)
            .route(":id", &[Method::DELETE], &self.delete)
    }
}

pub struct Controller {
    resource: Resource,
    prefix: String,
    gates: Vec<SharedGate>,
    actions: ActionMap,
}

impl Controller {
    /// The base controller: caller gates only, every operation answers 501.
    pub fn new(model: Arc<dyn ResourceModel>, gates: &[SharedGate], prefix: &str) -> Self {
        let actions = Operations::not_implemented().action_map();
        Self {
            resource: Resource::new(model),
            prefix: prefix.to_string(),
            gates: gates.to_vec(),
            actions,
        }
    }

    /// Builds a specialized controller.
    ///
    /// `caller_gates` is copied, never mutated; `default_gate` is appended after them.
    /// The action map is the default map over `operations` merged with `delta`.
    pub fn specialize(
        resource: Resource,
        caller_gates: &[SharedGate],
        default_gate: SharedGate,
        prefix: &str,
        operations: &Operations,
        delta: ActionMap,
    ) -> Self {
        let mut gates = Vec::with_capacity(caller_gates.len() + 1);
        gates.extend(caller_gates.iter().cloned());
        gates.push(default_gate);

        Self {
            resource,
            prefix: prefix.to_string(),
            gates,
            actions: ActionMap::merge(operations.action_map(), delta),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mount path: `prefix + "/" + lowercase(resource name)`.
    pub fn base(&self) -> String {
        format!("{}/{}", self.prefix, self.resource.name_lower())
    }

    pub fn action_map(&self) -> &ActionMap {
        &self.actions
    }

    /// Pre-gates in execution order.
    pub fn gates(&self) -> &[SharedGate] {
        &self.gates
    }

    /// Builds a fresh router from the current action map and gates. Not mounted.
    pub fn compile_router(&self) -> Router {
        crate::transport::http::router::compile(self)
    }
}

impl AsRef<Controller> for Controller {
    fn as_ref(&self) -> &Controller {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryModel;
    use crate::transport::http::gates::{AcceptGate, MediaFlavor};

    #[test]
    fn base_is_prefix_plus_lowercased_name() {
        let model = Arc::new(InMemoryModel::new("BlogPost"));
        assert_eq!(Controller::new(model.clone(), &[], "").base(), "/blogpost");
        let api = Controller::new(model, &[], "/api");
        assert_eq!(api.prefix(), "/api");
        assert_eq!(api.base(), "/api/blogpost");
    }

    #[test]
    fn default_map_routes_every_operation() {
        let controller = Controller::new(Arc::new(InMemoryModel::new("User")), &[], "");
        let map = controller.action_map();
        assert_eq!(
            map.paths().collect::<Vec<_>>(),
            vec!["", "index", "create", "delete/:id", "update/:id", ":id"]
        );
        assert_eq!(map.entry(":id").unwrap().methods().len(), 3);
        assert!(map
            .iter()
            .flat_map(|e| e.methods())
            .all(|(_, action)| action.name() == "not_implemented"));
    }

    #[test]
    fn specialize_copies_caller_gates_and_appends_default() {
        let caller: Vec<SharedGate> = vec![Arc::new(AcceptGate::new(MediaFlavor::Html))];
        let resource = Resource::new(Arc::new(InMemoryModel::new("User")));
        let controller = Controller::specialize(
            resource,
            &caller,
            Arc::new(AcceptGate::new(MediaFlavor::Json)),
            "/api",
            &Operations::not_implemented(),
            ActionMap::new(),
        );
        assert_eq!(caller.len(), 1);
        assert_eq!(controller.gates().len(), 2);
    }
}

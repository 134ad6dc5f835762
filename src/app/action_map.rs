//! The action map: path template → HTTP method → action.
//!
//! Controllers describe their routes as data. A specialized controller starts from the
//! default map and merges its own entries on top with [`ActionMap::merge`]; inherited
//! entries are never dropped, only replaced method-by-method.

use crate::transport::http::types::ActionRequest;
use axum::http::Method;
use axum::response::Response;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Name of the numeric path parameter.
pub const ID_PARAM: &str = "id";

pub type ActionFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

type ActionFn = dyn Fn(ActionRequest) -> ActionFuture + Send + Sync;

/// A named, type-erased request handler.
#[derive(Clone)]
pub struct Action {
    name: &'static str,
    handler: Arc<ActionFn>,
}

impl Action {
    pub fn new<F, Fut>(name: &'static str, handler: F) -> Self
    where
        F: Fn(ActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            name,
            handler: Arc::new(move |req: ActionRequest| -> ActionFuture { Box::pin(handler(req)) }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn call(&self, request: ActionRequest) -> Response {
        (self.handler)(request).await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.name).finish()
    }
}

/// All methods registered under one path template.
#[derive(Clone, Debug)]
pub struct ActionEntry {
    path: String,
    methods: Vec<(Method, Action)>,
}

impl ActionEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[(Method, Action)] {
        &self.methods
    }

    /// True when the template carries the numeric `:id` parameter.
    pub fn takes_id(&self) -> bool {
        takes_id(&self.path)
    }

    fn set(&mut self, method: Method, action: Action) {
        match self.methods.iter_mut().find(|(m, _)| *m == method) {
            Some(slot) => slot.1 = action,
            None => self.methods.push((method, action)),
        }
    }
}

pub fn takes_id(path: &str) -> bool {
    path.split('/')
        .any(|segment| segment.strip_prefix(':') == Some(ID_PARAM))
}

#[derive(Clone, Debug, Default)]
pub struct ActionMap {
    entries: Vec<ActionEntry>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` for each of `methods` under `path`, replacing any action
    /// already bound to the same path and method.
    pub fn route(mut self, path: &str, methods: &[Method], action: &Action) -> Self {
        for method in methods {
            self.insert(path, method.clone(), action.clone());
        }
        self
    }

    pub fn insert(&mut self, path: &str, method: Method, action: Action) {
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(entry) => entry.set(method, action),
            None => self.entries.push(ActionEntry {
                path: path.to_string(),
                methods: vec![(method, action)],
            }),
        }
    }

    /// Additive merge: every entry of `base` survives, `overrides` adds new paths and
    /// adds or replaces methods under existing ones. Base order is kept; new paths are
    /// appended in the order `overrides` lists them.
    pub fn merge(base: ActionMap, overrides: ActionMap) -> ActionMap {
        let mut merged = base;
        for entry in overrides.entries {
            for (method, action) in entry.methods {
                merged.insert(&entry.path, method, action);
            }
        }
        merged
    }

    pub fn get(&self, path: &str, method: &Method) -> Option<&Action> {
        self.entry(path)?
            .methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, action)| action)
    }

    pub fn entry(&self, path: &str) -> Option<&ActionEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every (path, method) pair of `other` is also routed here.
    pub fn is_superset_of(&self, other: &ActionMap) -> bool {
        other.entries.iter().all(|entry| {
            entry
                .methods
                .iter()
                .all(|(method, _)| self.get(&entry.path, method).is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn stub(name: &'static str) -> Action {
        Action::new(name, |_req| async { StatusCode::OK.into_response() })
    }

    #[test]
    fn route_replaces_existing_method_in_place() {
        let map = ActionMap::new()
            .route("", &[Method::GET, Method::POST], &stub("a"))
            .route("", &[Method::GET], &stub("b"));

        let entry = map.entry("").unwrap();
        assert_eq!(entry.methods().len(), 2);
        assert_eq!(entry.methods()[0].0, Method::GET);
        assert_eq!(map.get("", &Method::GET).unwrap().name(), "b");
        assert_eq!(map.get("", &Method::POST).unwrap().name(), "a");
    }

    #[test]
    fn merge_is_additive_with_override() {
        let base = ActionMap::new()
            .route("", &[Method::GET], &stub("list"))
            .route("create", &[Method::POST], &stub("create"));
        let overrides = ActionMap::new()
            .route("create", &[Method::GET], &stub("create_form"))
            .route("", &[Method::GET], &stub("other_list"))
            .route("update", &[Method::PUT], &stub("update"));

        let merged = ActionMap::merge(base.clone(), overrides);

        assert!(merged.is_superset_of(&base));
        assert_eq!(merged.paths().collect::<Vec<_>>(), vec!["", "create", "update"]);
        assert_eq!(merged.get("", &Method::GET).unwrap().name(), "other_list");
        assert_eq!(merged.get("create", &Method::POST).unwrap().name(), "create");
        assert_eq!(merged.get("create", &Method::GET).unwrap().name(), "create_form");
        assert_eq!(merged.get("update", &Method::PUT).unwrap().name(), "update");
    }

    #[test]
    fn superset_detects_missing_methods() {
        let small = ActionMap::new().route(":id", &[Method::GET, Method::DELETE], &stub("x"));
        let partial = ActionMap::new().route(":id", &[Method::GET], &stub("x"));
        assert!(small.is_superset_of(&partial));
        assert!(!partial.is_superset_of(&small));
    }

    #[test]
    fn takes_id_only_for_id_segments() {
        assert!(takes_id(":id"));
        assert!(takes_id("delete/:id"));
        assert!(!takes_id("delete"));
        assert!(!takes_id(""));
        assert!(!takes_id("idx"));
        assert!(!takes_id(":identity"));
    }
}

use crate::app::action_map::Action;
use crate::app::controller::Resource;
use crate::domain::model::{pk_from_json, Filter};
use crate::transport::http::error::HttpError;
use crate::transport::http::types::ActionRequest;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use std::sync::Arc;

/// Wraps a fallible handler method into an [`Action`] bound to `state`.
pub fn bind<T, F, Fut>(name: &'static str, state: &Arc<T>, f: F) -> Action
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, ActionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
{
    let state = Arc::clone(state);
    Action::new(name, move |req| {
        let fut = f(Arc::clone(&state), req);
        async move { fut.await.unwrap_or_else(IntoResponse::into_response) }
    })
}

/// The resource-keyed section of the body (`{ "<Resource>": {...} }`), `{}` when absent.
pub fn resource_attributes(
    resource: &Resource,
    body: &JsonValue,
) -> Result<Map<String, JsonValue>, HttpError> {
    match body.get(resource.name()) {
        None | Some(JsonValue::Null) => Ok(Map::new()),
        Some(JsonValue::Object(attrs)) => Ok(attrs.clone()),
        Some(other) => Err(HttpError::BadRequest(format!(
            "Expected `{}` to be an object, got {}.",
            resource.name(),
            other
        ))),
    }
}

/// Filter for list actions; an absent or non-object section means no filter.
pub fn list_filter(resource: &Resource, body: &JsonValue) -> Filter {
    match body.get(resource.name()) {
        Some(JsonValue::Object(filter)) => filter.clone(),
        _ => Filter::new(),
    }
}

/// Prepares upsert attributes: the path id, when present, overwrites any body id.
/// Returns the attributes and the id the record should be re-fetched by.
pub fn upsert_target(
    resource: &Resource,
    req: &ActionRequest,
) -> Result<(JsonValue, Option<i64>), HttpError> {
    let mut attrs = resource_attributes(resource, &req.body)?;
    let pk = resource.primary_key_field();
    if let Some(id) = req.id {
        attrs.insert(pk.to_string(), JsonValue::from(id));
    }
    let target = attrs.get(pk).and_then(pk_from_json);
    Ok((JsonValue::Object(attrs), target))
}

/// Id of the record to delete: the path id, else the primary key in the body section.
pub fn delete_target(resource: &Resource, req: &ActionRequest) -> Option<i64> {
    req.id.or_else(|| {
        req.body
            .get(resource.name())
            .and_then(|attrs| attrs.get(resource.primary_key_field()))
            .and_then(pk_from_json)
    })
}

pub fn display_id(id: Option<i64>) -> String {
    id.map_or_else(|| "undefined".to_string(), |id| id.to_string())
}

pub fn not_found_by_id(id: Option<i64>) -> HttpError {
    HttpError::NotFound(format!("Can not find model by id {}.", display_id(id)))
}

/// 500 raised when an update or delete cannot resolve its target record.
pub fn missing_target(resource: &Resource, id: Option<i64>, verb: &str) -> HttpError {
    HttpError::Internal(format!(
        "Can not find {} of id {} to {}.",
        resource.name_lower(),
        display_id(id),
        verb
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryModel;
    use axum::http::Method;
    use serde_json::json;

    fn resource() -> Resource {
        Resource::new(Arc::new(InMemoryModel::new("User")))
    }

    #[test]
    fn path_id_takes_precedence_over_body_id() {
        let req = ActionRequest::new(
            Method::PUT,
            Some(4),
            json!({"User": {"id": 9, "name": "x"}}),
        );
        let (attrs, target) = upsert_target(&resource(), &req).unwrap();
        assert_eq!(attrs, json!({"id": 4, "name": "x"}));
        assert_eq!(target, Some(4));
    }

    #[test]
    fn body_id_is_used_without_path_id() {
        let req = ActionRequest::new(Method::POST, None, json!({"User": {"id": "9"}}));
        let (_, target) = upsert_target(&resource(), &req).unwrap();
        assert_eq!(target, Some(9));
        assert_eq!(delete_target(&resource(), &req), Some(9));
    }

    #[test]
    fn non_object_section_is_rejected() {
        assert!(resource_attributes(&resource(), &json!({"User": 3})).is_err());
        assert!(resource_attributes(&resource(), &json!({})).unwrap().is_empty());
        assert!(list_filter(&resource(), &json!({"User": "x"})).is_empty());
    }

    #[test]
    fn messages_name_resource_and_id() {
        assert_eq!(
            missing_target(&resource(), Some(3), "delete").to_string(),
            "Can not find user of id 3 to delete."
        );
        assert_eq!(
            not_found_by_id(None).to_string(),
            "Can not find model by id undefined."
        );
    }
}

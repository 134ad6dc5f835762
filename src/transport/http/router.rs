use crate::app::action_map::{Action, ID_PARAM};
use crate::app::controller::Controller;
use crate::domain::model::parse_numeric_id;
use crate::transport::http::gates::{run_gates, GateChain};
use crate::transport::http::types::{read_body, ActionRequest};
use axum::extract::{FromRequestParts, Path, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use std::collections::HashMap;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::path::{
    OperationBuilder, ParameterBuilder, ParameterIn, PathItem, PathItemType,
};
use utoipa::openapi::{
    InfoBuilder, ObjectBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Required,
    ResponseBuilder, SchemaType,
};
use utoipa_swagger_ui::SwaggerUi;

/// `""` → `/`, `"delete/:id"` → `/delete/:id`.
fn route_path(template: &str) -> String {
    format!("/{}", template)
}

/// Compiles a controller's action map and gates into a router.
///
/// Each path gets one `MethodRouter` holding all of its methods; the gate chain wraps
/// every route as a single middleware layer so gates run in registration order.
pub fn compile(controller: &Controller) -> Router {
    let mut router = Router::new();

    for entry in controller.action_map().iter() {
        let takes_id = entry.takes_id();
        let mut method_router: MethodRouter = MethodRouter::new();
        for (method, action) in entry.methods() {
            let filter = match MethodFilter::try_from(method.clone()) {
                Ok(f) => f,
                Err(_) => {
                    tracing::warn!(path = entry.path(), %method, "skipping unroutable method");
                    continue;
                }
            };
            let action = action.clone();
            method_router = method_router.on(filter, move |request: Request| {
                let action = action.clone();
                async move { dispatch(action, takes_id, request).await }
            });
        }
        router = router.route(&route_path(entry.path()), method_router);
    }

    if controller.gates().is_empty() {
        return router;
    }
    router.layer(from_fn_with_state(
        GateChain::new(controller.gates()),
        run_gates,
    ))
}

async fn dispatch(action: Action, takes_id: bool, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();

    let id = if takes_id {
        let Path(params) =
            match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
                Ok(p) => p,
                Err(rejection) => return rejection.into_response(),
            };
        // Non-numeric ids behave as if the route never matched.
        match params.get(ID_PARAM).and_then(|raw| parse_numeric_id(raw)) {
            Some(id) => Some(id),
            None => return StatusCode::NOT_FOUND.into_response(),
        }
    } else {
        None
    };

    let body = match read_body(&parts.headers, body).await {
        Ok(b) => b,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(action = action.name(), method = %parts.method, uri = %parts.uri, ?id, "dispatching");
    action
        .call(ActionRequest {
            method: parts.method,
            id,
            headers: parts.headers,
            body,
        })
        .await
}

/// Nests the controller's compiled router at its base path.
pub fn mount_controller<C: AsRef<Controller>>(app: Router, controller: &C) -> Router {
    let controller = controller.as_ref();
    let base = controller.base();
    tracing::info!(base = %base, routes = controller.action_map().len(), "mounting controller");
    match base.as_str() {
        "/" => app.merge(controller.compile_router()),
        path => app.nest(path, controller.compile_router()),
    }
}

fn path_item_type(method: &Method) -> Option<PathItemType> {
    Some(match method.as_str() {
        "GET" => PathItemType::Get,
        "POST" => PathItemType::Post,
        "PUT" => PathItemType::Put,
        "DELETE" => PathItemType::Delete,
        "PATCH" => PathItemType::Patch,
        "HEAD" => PathItemType::Head,
        "OPTIONS" => PathItemType::Options,
        "TRACE" => PathItemType::Trace,
        _ => return None,
    })
}

/// `/api/user` + `delete/:id` → `/api/user/delete/{id}`.
fn openapi_path(base: &str, template: &str) -> String {
    let segments: Vec<String> = template
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(param) => format!("{{{}}}", param),
            None => s.to_string(),
        })
        .collect();
    if segments.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, segments.join("/"))
    }
}

fn paths_for(controller: &Controller, mut paths: PathsBuilder) -> PathsBuilder {
    let base = controller.base();
    let tag = controller.resource().name_lower().to_string();

    for entry in controller.action_map().iter() {
        let mut item: Option<PathItem> = None;
        for (method, action) in entry.methods() {
            let Some(kind) = path_item_type(method) else {
                continue;
            };
            let mut op = OperationBuilder::new()
                .tags(Some(vec![tag.clone()]))
                .operation_id(Some(format!(
                    "{}_{}_{}",
                    tag,
                    action.name(),
                    method.as_str().to_lowercase()
                )))
                .summary(Some(format!("{} {}", action.name(), controller.resource().name())))
                .response("200", ResponseBuilder::new().description("Success").build())
                .response(
                    "406",
                    ResponseBuilder::new().description("Not Acceptable").build(),
                );
            if entry.takes_id() {
                op = op
                    .parameters(Some(vec![ParameterBuilder::new()
                        .name(ID_PARAM)
                        .parameter_in(ParameterIn::Path)
                        .required(Required::True)
                        .schema(Some(ObjectBuilder::new().schema_type(SchemaType::Integer)))
                        .build()]))
                    .response("404", ResponseBuilder::new().description("Not Found").build());
            }
            let op = op.build();
            match item.as_mut() {
                Some(existing) => {
                    existing.operations.insert(kind, op);
                }
                None => item = Some(PathItem::new(kind, op)),
            }
        }
        if let Some(item) = item {
            paths = paths.path(openapi_path(&base, entry.path()), item);
        }
    }
    paths
}

/// OpenAPI document describing every route of `controllers`.
pub fn openapi(controllers: &[&Controller]) -> OpenApi {
    let mut paths = PathsBuilder::new();
    for controller in controllers {
        paths = paths_for(controller, paths);
    }
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .build()
}

/// Mounts every controller and serves their OpenAPI document behind Swagger UI.
pub fn create_router(controllers: &[&Controller]) -> Router {
    let app = controllers
        .iter()
        .fold(Router::new(), |app, controller| mount_controller(app, *controller));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi(controllers)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_paths_are_rooted() {
        assert_eq!(route_path(""), "/");
        assert_eq!(route_path(":id"), "/:id");
        assert_eq!(route_path("update/:id"), "/update/:id");
    }

    #[test]
    fn openapi_paths_use_braces() {
        assert_eq!(openapi_path("/api/user", ""), "/api/user");
        assert_eq!(openapi_path("/api/user", ":id"), "/api/user/{id}");
        assert_eq!(openapi_path("/user", "delete/:id"), "/user/delete/{id}");
        assert_eq!(openapi_path("/user", "index"), "/user/index");
    }
}

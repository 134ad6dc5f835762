//! Pre-gates: request filters that run before any action.
//!
//! A gate sees only the request head. Returning `Err(response)` ends the request with
//! that response; no later gate or action runs and the body is never read.

use crate::transport::http::error::HttpError;
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::ACCEPT;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

#[async_trait]
pub trait PreGate: Send + Sync {
    async fn check(&self, request: &Parts) -> Result<(), Response>;
}

pub type SharedGate = Arc<dyn PreGate>;

/// Adapts a synchronous closure into a gate.
pub fn gate_fn<F>(f: F) -> SharedGate
where
    F: Fn(&Parts) -> Result<(), Response> + Send + Sync + 'static,
{
    Arc::new(FnGate(f))
}

struct FnGate<F>(F);

#[async_trait]
impl<F> PreGate for FnGate<F>
where
    F: Fn(&Parts) -> Result<(), Response> + Send + Sync + 'static,
{
    async fn check(&self, request: &Parts) -> Result<(), Response> {
        (self.0)(request)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaFlavor {
    Json,
    Html,
}

impl MediaFlavor {
    fn matches(self, media_type: &str) -> bool {
        if media_type == "*/*" {
            return true;
        }
        match self {
            MediaFlavor::Json => {
                media_type == "application/json"
                    || media_type == "application/*"
                    || media_type.ends_with("+json")
            }
            MediaFlavor::Html => {
                media_type == "text/html"
                    || media_type == "text/*"
                    || media_type == "application/xhtml+xml"
            }
        }
    }

    fn rejection(self) -> &'static str {
        match self {
            MediaFlavor::Json => "Not Acceptable",
            MediaFlavor::Html => "Not Acceptable.",
        }
    }
}

/// True when the `Accept` headers admit `flavor`. No `Accept` header admits anything.
pub fn accepts(headers: &HeaderMap, flavor: MediaFlavor) -> bool {
    let mut values = headers.get_all(ACCEPT).iter().peekable();
    if values.peek().is_none() {
        return true;
    }

    values
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|range| {
            let mut parts = range.split(';');
            let media_type = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            // parameter names are case-insensitive
            let quality = parts
                .filter_map(|p| p.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
                .and_then(|(_, q)| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            quality > 0.0 && flavor.matches(&media_type)
        })
}

/// Content-negotiation gate: answers 406 unless the client accepts `flavor`.
pub struct AcceptGate {
    flavor: MediaFlavor,
}

impl AcceptGate {
    pub fn new(flavor: MediaFlavor) -> Self {
        Self { flavor }
    }

    pub fn shared(flavor: MediaFlavor) -> SharedGate {
        Arc::new(Self::new(flavor))
    }
}

#[async_trait]
impl PreGate for AcceptGate {
    async fn check(&self, request: &Parts) -> Result<(), Response> {
        if accepts(&request.headers, self.flavor) {
            Ok(())
        } else {
            tracing::debug!(uri = %request.uri, flavor = ?self.flavor, "rejecting unacceptable request");
            Err(HttpError::NotAcceptable(self.flavor.rejection()).into_response())
        }
    }
}

/// Ordered gate list installed as one middleware layer.
#[derive(Clone)]
pub struct GateChain(Arc<[SharedGate]>);

impl GateChain {
    pub fn new(gates: &[SharedGate]) -> Self {
        Self(gates.iter().cloned().collect())
    }
}

pub async fn run_gates(State(chain): State<GateChain>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    for gate in chain.0.iter() {
        if let Err(rejection) = gate.check(&parts).await {
            return rejection;
        }
    }
    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(accept: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(ACCEPT, HeaderValue::from_str(accept).unwrap());
        h
    }

    #[test]
    fn missing_accept_admits_everything() {
        assert!(accepts(&HeaderMap::new(), MediaFlavor::Json));
        assert!(accepts(&HeaderMap::new(), MediaFlavor::Html));
    }

    #[test]
    fn json_flavor() {
        assert!(accepts(&headers("application/json"), MediaFlavor::Json));
        assert!(accepts(&headers("text/html, application/json;q=0.5"), MediaFlavor::Json));
        assert!(accepts(&headers("application/vnd.api+json"), MediaFlavor::Json));
        assert!(accepts(&headers("*/*"), MediaFlavor::Json));
        assert!(!accepts(&headers("text/html"), MediaFlavor::Json));
        assert!(!accepts(&headers("application/json;q=0"), MediaFlavor::Json));
        assert!(!accepts(&headers("application/json; Q=0"), MediaFlavor::Json));
        assert!(accepts(&headers("application/json; Q=0.4"), MediaFlavor::Json));
    }

    #[test]
    fn html_flavor() {
        assert!(accepts(
            &headers("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            MediaFlavor::Html
        ));
        assert!(accepts(&headers("text/*"), MediaFlavor::Html));
        assert!(!accepts(&headers("application/json"), MediaFlavor::Html));
    }

    #[tokio::test]
    async fn accept_gate_rejects_with_406() {
        let (parts, _) = axum::http::Request::builder()
            .header(ACCEPT, "text/plain")
            .body(())
            .unwrap()
            .into_parts();
        let rejection = AcceptGate::new(MediaFlavor::Json)
            .check(&parts)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), axum::http::StatusCode::NOT_ACCEPTABLE);
    }
}

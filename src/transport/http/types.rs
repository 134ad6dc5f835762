use crate::transport::http::error::HttpError;
use axum::body::{to_bytes, Body};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value as JsonValue};

/// Upper bound on request bodies read by actions.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// What an action sees of a request once routing and gating are done.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub method: Method,
    /// Numeric `:id` path parameter, when the route has one.
    pub id: Option<i64>,
    pub headers: HeaderMap,
    /// Decoded body; `{}` when the request had none.
    pub body: JsonValue,
}

impl ActionRequest {
    pub fn new(method: Method, id: Option<i64>, body: JsonValue) -> Self {
        Self {
            method,
            id,
            headers: HeaderMap::new(),
            body,
        }
    }
}

/// Reads and decodes a request body: JSON, urlencoded forms, or nothing.
pub async fn read_body(headers: &HeaderMap, body: Body) -> Result<JsonValue, HttpError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| HttpError::UnprocessableEntity(e.to_string()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(Map::new()));
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return Ok(decode_form(&bytes));
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        HttpError::UnprocessableEntity(format!("{} (expected a JSON object)", e))
    })
}

/// Decodes a urlencoded form. Bracketed keys nest: `User[name]=x` → `{"User":{"name":"x"}}`.
pub fn decode_form(bytes: &[u8]) -> JsonValue {
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let mut path = key.split('[').map(|seg| seg.trim_end_matches(']'));
        let head = path.next().unwrap_or_default().to_string();
        let rest: Vec<&str> = path.filter(|seg| !seg.is_empty()).collect();
        insert_nested(&mut root, head, &rest, JsonValue::String(value.into_owned()));
    }
    JsonValue::Object(root)
}

fn insert_nested(map: &mut Map<String, JsonValue>, key: String, rest: &[&str], value: JsonValue) {
    match rest.split_first() {
        None => {
            map.insert(key, value);
        }
        Some((next, tail)) => {
            let slot = map
                .entry(key)
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(child) = slot {
                insert_nested(child, next.to_string(), tail, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn decode_form_nests_bracketed_keys() {
        let v = decode_form(b"User[name]=Ada+L&User[email]=a%40x&flag=1");
        assert_eq!(
            v,
            json!({"User": {"name": "Ada L", "email": "a@x"}, "flag": "1"})
        );
    }

    #[tokio::test]
    async fn empty_body_is_empty_object() {
        let v = read_body(&HeaderMap::new(), Body::empty()).await.unwrap();
        assert_eq!(v, json!({}));
    }

    #[tokio::test]
    async fn malformed_json_is_unprocessable() {
        let err = read_body(&HeaderMap::new(), Body::from("{nope"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn form_bodies_follow_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let v = read_body(&headers, Body::from("User[name]=x")).await.unwrap();
        assert_eq!(v, json!({"User": {"name": "x"}}));
    }
}

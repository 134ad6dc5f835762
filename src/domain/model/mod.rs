//! Domain model definitions for controller-managed resources.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Equality constraints (`{ "column": value }`) applied by `find_all`.
pub type Filter = serde_json::Map<String, JsonValue>;

/// Trait that defines the contract for any persisted resource a controller can serve.
///
/// Controllers only hold an `Arc<dyn ResourceModel>` and never look behind it, so the
/// same controller code works over the in-memory store, Postgres, or a test double.
/// Each implementation provides:
/// - The stable resource name (URL and view-folder segments derive from it)
/// - Primary key lookup, filtered scans, create, upsert and destroy
/// - Optionally, a blank unpersisted instance for "new record" forms
#[async_trait]
pub trait ResourceModel: Send + Sync {
    /// Returns the stable name of the resource (e.g. `User`).
    fn resource_name(&self) -> &str;

    /// Returns the name of the primary key field for this model.
    fn primary_key_field(&self) -> &str {
        "id"
    }

    /// Builds a fresh, unpersisted instance.
    ///
    /// Default implementation returns an empty object.
    fn build(&self) -> JsonValue {
        JsonValue::Object(serde_json::Map::new())
    }

    /// Returns every record matching all constraints in `filter`.
    /// An empty filter is an unfiltered scan.
    async fn find_all(&self, filter: &Filter) -> anyhow::Result<Vec<JsonValue>>;

    /// Looks a record up by primary key. `Ok(None)` on no match.
    async fn find_by_pk(&self, id: i64) -> anyhow::Result<Option<JsonValue>>;

    /// Persists a new record and returns it as stored.
    /// `Ok(None)` means nothing was created.
    async fn create(&self, attributes: JsonValue) -> anyhow::Result<Option<JsonValue>>;

    /// Creates or updates the record identified by the primary key in `attributes`.
    /// Returns `true` when a new record was created.
    async fn upsert(&self, attributes: JsonValue) -> anyhow::Result<bool>;

    /// Removes a record previously returned by this model.
    async fn destroy(&self, record: &JsonValue) -> anyhow::Result<()>;
}

/// Reads an integer primary key out of a JSON value (numbers or numeric strings).
pub fn pk_from_json(pk: &JsonValue) -> Option<i64> {
    if let Some(i) = pk.as_i64() {
        return Some(i);
    }
    if let Some(s) = pk.as_str() {
        return parse_numeric_id(s);
    }
    None
}

/// Parses a path or body id. Only ASCII digits that fit in `i64` are accepted.
pub fn parse_numeric_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_only_accept_digits() {
        assert_eq!(parse_numeric_id("42"), Some(42));
        assert_eq!(parse_numeric_id("007"), Some(7));
        assert_eq!(parse_numeric_id(""), None);
        assert_eq!(parse_numeric_id("abc"), None);
        assert_eq!(parse_numeric_id("-1"), None);
        assert_eq!(parse_numeric_id("+1"), None);
        assert_eq!(parse_numeric_id("99999999999999999999"), None);
    }

    #[test]
    fn pk_from_json_accepts_numbers_and_numeric_strings() {
        assert_eq!(pk_from_json(&json!(5)), Some(5));
        assert_eq!(pk_from_json(&json!("12")), Some(12));
        assert_eq!(pk_from_json(&json!("x")), None);
        assert_eq!(pk_from_json(&json!(null)), None);
        assert_eq!(pk_from_json(&json!(1.5)), None);
    }
}

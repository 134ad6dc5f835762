//! In-process model store.
//!
//! Records live in an ordered map keyed by their integer primary key, so scans come
//! back in id order. Used by the demo server when no database is configured and by tests.

use crate::domain::model::{pk_from_json, Filter, ResourceModel};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

struct Table {
    rows: BTreeMap<i64, JsonValue>,
    next_id: i64,
}

impl Table {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn observe_id(&mut self, id: i64) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }
}

pub struct InMemoryModel {
    name: String,
    primary_key_field: String,
    fields: Vec<String>,
    table: RwLock<Table>,
}

impl InMemoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key_field: "id".to_string(),
            fields: Vec::new(),
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Declares the attribute names `build()` fills with nulls.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key_field = field.into();
        self
    }

    /// Inserts records as-is; records without a primary key get the next free id.
    pub async fn seed<I>(&self, records: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = JsonValue>,
    {
        for record in records {
            self.create(record).await?;
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    fn object(&self, attributes: JsonValue) -> anyhow::Result<serde_json::Map<String, JsonValue>> {
        match attributes {
            JsonValue::Object(map) => Ok(map),
            JsonValue::Null => Ok(serde_json::Map::new()),
            other => bail!("{} attributes must be an object, got {}", self.name, other),
        }
    }

    fn explicit_pk(&self, record: &serde_json::Map<String, JsonValue>) -> anyhow::Result<Option<i64>> {
        match record.get(&self.primary_key_field) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(v) => pk_from_json(v)
                .map(Some)
                .ok_or_else(|| anyhow!("invalid {} primary key: {}", self.name, v)),
        }
    }
}

fn matches(record: &JsonValue, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

#[async_trait]
impl ResourceModel for InMemoryModel {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn primary_key_field(&self) -> &str {
        &self.primary_key_field
    }

    fn build(&self) -> JsonValue {
        let blank: serde_json::Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|f| (f.clone(), JsonValue::Null))
            .collect();
        JsonValue::Object(blank)
    }

    async fn find_all(&self, filter: &Filter) -> anyhow::Result<Vec<JsonValue>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|record| matches(record, filter))
            .cloned()
            .collect())
    }

    async fn find_by_pk(&self, id: i64) -> anyhow::Result<Option<JsonValue>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn create(&self, attributes: JsonValue) -> anyhow::Result<Option<JsonValue>> {
        let mut record = self.object(attributes)?;
        let explicit = self.explicit_pk(&record)?;

        let mut table = self.table.write().await;
        let id = match explicit {
            Some(id) if table.rows.contains_key(&id) => {
                bail!("duplicate {} primary key {}", self.name, id)
            }
            Some(id) => {
                table.observe_id(id);
                id
            }
            None => table.allocate_id(),
        };
        record.insert(self.primary_key_field.clone(), JsonValue::from(id));
        let record = JsonValue::Object(record);
        table.rows.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn upsert(&self, attributes: JsonValue) -> anyhow::Result<bool> {
        let mut incoming = self.object(attributes)?;
        let explicit = self.explicit_pk(&incoming)?;

        let mut table = self.table.write().await;
        if let Some(id) = explicit {
            if let Some(JsonValue::Object(existing)) = table.rows.get_mut(&id) {
                incoming.remove(&self.primary_key_field);
                existing.extend(incoming);
                return Ok(false);
            }
            table.observe_id(id);
            incoming.insert(self.primary_key_field.clone(), JsonValue::from(id));
            table.rows.insert(id, JsonValue::Object(incoming));
            return Ok(true);
        }

        let id = table.allocate_id();
        incoming.insert(self.primary_key_field.clone(), JsonValue::from(id));
        table.rows.insert(id, JsonValue::Object(incoming));
        Ok(true)
    }

    async fn destroy(&self, record: &JsonValue) -> anyhow::Result<()> {
        let id = record
            .get(&self.primary_key_field)
            .and_then(pk_from_json)
            .ok_or_else(|| anyhow!("cannot destroy {} without a primary key", self.name))?;
        self.table.write().await.rows.remove(&id);
        Ok(())
    }
}

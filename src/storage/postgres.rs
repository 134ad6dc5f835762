//! Postgres-backed model.
//!
//! Records travel as `row_to_json(...)` documents so the controller layer never needs
//! to know column types; writes go through `jsonb_populate_record`, which lets Postgres
//! do the casting against the table's own row type.

use crate::domain::model::{pk_from_json, Filter, ResourceModel};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

pub struct PostgresModel {
    pool: PgPool,
    table: String,
    primary_key_field: String,
    primary_key_kind: PkKind,
    columns: Vec<String>,
}

/// How a primary key is compared against the `i64` ids controllers route on.
/// The column itself is never cast, so its index stays usable.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PkKind {
    /// `int2` / `int4` / `int8`: bound as `i64` and compared directly.
    Integer,
    /// Any other type: bound as text and cast to the column type.
    Cast(String),
}

impl PkKind {
    fn from_udt(udt: &str) -> Option<Self> {
        match udt {
            "int2" | "int4" | "int8" => Some(PkKind::Integer),
            other if validate_ident(other) => Some(PkKind::Cast(other.to_string())),
            _ => None,
        }
    }

    /// `<column> = $n`, casting the parameter when the key is not an integer.
    fn predicate(&self, column: &str, param: usize) -> String {
        match self {
            PkKind::Integer => format!("{} = ${}", column, param),
            PkKind::Cast(udt) => format!("{} = ${}::text::{}", column, param, udt),
        }
    }
}

/// Identifiers are spliced into SQL, so only plain names are allowed.
pub fn validate_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

/// Text form used for `col::text = $n` comparisons.
fn filter_text(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl PostgresModel {
    /// Connects to `database_url` and binds the model to `table`.
    pub async fn connect(database_url: &str, table: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::new(pool, table).await
    }

    /// Binds the model to an existing table, introspecting its columns and primary key.
    pub async fn new(pool: PgPool, table: &str) -> anyhow::Result<Self> {
        if !validate_ident(table) {
            bail!("invalid table name '{}'", table);
        }

        let col_rows = sqlx::query(
            "SELECT column_name, udt_name
             FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&pool)
        .await?;

        let mut columns = Vec::with_capacity(col_rows.len());
        let mut udts = Vec::with_capacity(col_rows.len());
        for row in col_rows {
            let name: String = row.try_get("column_name")?;
            if validate_ident(&name) {
                udts.push(row.try_get::<String, _>("udt_name")?);
                columns.push(name);
            }
        }
        if columns.is_empty() {
            bail!("table '{}' not found or has no columns", table);
        }

        let pk_row = sqlx::query(
            r#"
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = current_schema()
              AND tc.table_name = $1
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
            LIMIT 1
            "#,
        )
        .bind(table)
        .fetch_optional(&pool)
        .await?;

        let primary_key_field = match pk_row {
            Some(row) => row.try_get::<String, _>("column_name")?,
            None => "id".to_string(),
        };
        let Some(pk_index) = columns.iter().position(|c| *c == primary_key_field) else {
            bail!("table '{}' has no '{}' column", table, primary_key_field);
        };
        let primary_key_kind = PkKind::from_udt(&udts[pk_index]).ok_or_else(|| {
            anyhow!("unsupported primary key type '{}' on {}", udts[pk_index], table)
        })?;

        Ok(Self {
            pool,
            table: table.to_string(),
            primary_key_field,
            primary_key_kind,
            columns,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn bind_pk<'q>(
        &self,
        query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
        id: i64,
    ) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
        match self.primary_key_kind {
            PkKind::Integer => query.bind(id),
            PkKind::Cast(_) => query.bind(id.to_string()),
        }
    }

    /// Known columns present in `attributes`, in table order.
    fn writable_columns(&self, attributes: &JsonValue) -> anyhow::Result<Vec<&str>> {
        let obj = match attributes {
            JsonValue::Object(obj) => obj,
            JsonValue::Null => return Ok(Vec::new()),
            other => bail!("{} attributes must be an object, got {}", self.table, other),
        };
        for key in obj.keys() {
            if !self.columns.contains(key) {
                tracing::warn!(table = %self.table, column = %key, "ignoring unknown column");
            }
        }
        Ok(self
            .columns
            .iter()
            .filter(|c| obj.contains_key(c.as_str()))
            .map(String::as_str)
            .collect())
    }

    /// `INSERT ... SELECT cols FROM jsonb_populate_record(...)` shared by create and upsert.
    fn insert_query<'a>(
        &self,
        columns: &[&str],
        attributes: &'a JsonValue,
    ) -> QueryBuilder<'a, Postgres> {
        let table = quote(&self.table);
        let mut qb = QueryBuilder::new(format!("INSERT INTO {} ", table));
        if columns.is_empty() {
            qb.push("DEFAULT VALUES");
            return qb;
        }
        let cols = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
        qb.push(format!("({}) SELECT {} FROM jsonb_populate_record(NULL::{}, ", cols, cols, table));
        qb.push_bind(Json(attributes));
        qb.push(")");
        qb
    }
}

#[async_trait]
impl ResourceModel for PostgresModel {
    fn resource_name(&self) -> &str {
        &self.table
    }

    fn primary_key_field(&self) -> &str {
        &self.primary_key_field
    }

    fn build(&self) -> JsonValue {
        let blank: serde_json::Map<String, JsonValue> = self
            .columns
            .iter()
            .map(|c| (c.clone(), JsonValue::Null))
            .collect();
        JsonValue::Object(blank)
    }

    async fn find_all(&self, filter: &Filter) -> anyhow::Result<Vec<JsonValue>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT row_to_json(t.*) AS record FROM {} t",
            quote(&self.table)
        ));

        let mut first = true;
        for (field, value) in filter {
            if !self.columns.contains(field) {
                bail!("unknown column '{}' in {} filter", field, self.table);
            }
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
            match filter_text(value) {
                Some(text) => {
                    qb.push(format!("t.{}::text = ", quote(field)));
                    qb.push_bind(text);
                }
                None => {
                    qb.push(format!("t.{} IS NULL", quote(field)));
                }
            }
        }
        qb.push(format!(" ORDER BY t.{}", quote(&self.primary_key_field)));

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| r.try_get::<JsonValue, _>("record").map_err(anyhow::Error::from))
            .collect()
    }

    async fn find_by_pk(&self, id: i64) -> anyhow::Result<Option<JsonValue>> {
        let sql = format!(
            "SELECT row_to_json(t.*) AS record FROM {} t WHERE {}",
            quote(&self.table),
            self.primary_key_kind
                .predicate(&format!("t.{}", quote(&self.primary_key_field)), 1)
        );
        let row = self
            .bind_pk(sqlx::query(&sql), id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(Some(r.try_get("record")?)),
            None => Ok(None),
        }
    }

    async fn create(&self, attributes: JsonValue) -> anyhow::Result<Option<JsonValue>> {
        let columns = self.writable_columns(&attributes)?;
        let mut qb = self.insert_query(&columns, &attributes);
        qb.push(format!(" RETURNING row_to_json({}.*) AS record", quote(&self.table)));

        let row = qb.build().fetch_optional(&self.pool).await?;
        match row {
            Some(r) => Ok(Some(r.try_get("record")?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, attributes: JsonValue) -> anyhow::Result<bool> {
        let columns = self.writable_columns(&attributes)?;
        let mut qb = self.insert_query(&columns, &attributes);

        let pk = quote(&self.primary_key_field);
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != self.primary_key_field)
            .map(|c| format!("{} = EXCLUDED.{}", quote(c), quote(c)))
            .collect();
        if updates.is_empty() {
            qb.push(format!(" ON CONFLICT ({}) DO NOTHING", pk));
        } else {
            qb.push(format!(" ON CONFLICT ({}) DO UPDATE SET {}", pk, updates.join(", ")));
        }
        // xmax is 0 only for freshly inserted tuples.
        qb.push(" RETURNING (xmax = 0) AS inserted");

        let row = qb.build().fetch_optional(&self.pool).await?;
        match row {
            Some(r) => Ok(r.try_get::<bool, _>("inserted")?),
            None => Ok(false),
        }
    }

    async fn destroy(&self, record: &JsonValue) -> anyhow::Result<()> {
        let id = record
            .get(&self.primary_key_field)
            .and_then(pk_from_json)
            .ok_or_else(|| anyhow!("cannot destroy {} row without a primary key", self.table))?;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote(&self.table),
            self.primary_key_kind
                .predicate(&quote(&self.primary_key_field), 1)
        );
        self.bind_pk(sqlx::query(&sql), id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

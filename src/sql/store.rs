//! Read-only access to the product catalog

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::extract::SelectQuery;
use crate::{Error, Result};

/// One result row: column name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Row of the `product` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_link: String,
    pub title: String,
    pub brand: String,
    /// Indian Rupees
    #[serde(deserialize_with = "whole_number")]
    pub price: i64,
    /// Fraction of the price, e.g. `0.35`
    pub discount: f64,
    pub avg_rating: f64,
    #[serde(deserialize_with = "whole_number")]
    pub total_ratings: i64,
}

impl ProductRecord {
    /// `None` unless the record has every product column.
    pub fn from_record(record: &Record) -> Option<Self> {
        serde_json::from_value(Value::Object(record.clone())).ok()
    }
}

// SQLite may hand back whole numbers stored as REAL
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as i64)
}

/// SQLite product store, opened read-only once per query.
#[derive(Debug, Clone)]
pub struct ProductStore {
    path: PathBuf,
}

impl ProductStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a validated query on a blocking worker.
    pub async fn execute(&self, query: &SelectQuery) -> Result<Vec<Record>> {
        let path = self.path.clone();
        let sql = query.as_str().to_string();
        tokio::task::spawn_blocking(move || run_query(&path, &sql)).await?
    }
}

fn run_query(path: &Path, sql: &str) -> Result<Vec<Record>> {
    if !path.exists() {
        return Err(Error::DatabaseError(format!(
            "Product database not found: {}",
            path.display()
        )));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(Error::ForbiddenQuery(sql.to_string()));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        records.push(record);
    }

    debug!(rows = records.len(), "Query executed");
    Ok(records)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

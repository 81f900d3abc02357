//! Connection pool and the query seam the repositories talk to.
//!
//! Repositories never see `sqlx` directly: they hand a statement and its
//! bound parameters to a [`QueryExecutor`] and get plain rows back. The
//! production executor is the SQLite pool; tests swap in a fake.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Settings;
use crate::db::error::StorageError;

/// One result row: column name to value.
pub type Row = Map<String, Value>;

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Integer(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Param::Null, Into::into)
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    /// Runs one statement with positional parameters and returns every row it yields.
    async fn query(&self, sql: &str, params: Vec<Param>) -> Result<Vec<Row>, StorageError>;
}

#[async_trait]
impl QueryExecutor for SqlitePool {
    async fn query(&self, sql: &str, params: Vec<Param>) -> Result<Vec<Row>, StorageError> {
        debug!(sql, params = params.len(), "executing statement");

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }

        let rows = query.fetch_all(self).await?;
        rows.iter().map(decode_row).collect()
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_param(query: SqliteQuery<'_>, param: Param) -> SqliteQuery<'_> {
    match param {
        Param::Null => query.bind(None::<String>),
        Param::Integer(value) => query.bind(value),
        Param::Text(value) => query.bind(value),
    }
}

/// Decodes a row by the storage class of each value, so no column types
/// need to be known up front.
fn decode_row(row: &SqliteRow) -> Result<Row, StorageError> {
    let mut out = Map::new();

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" => Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => Value::from(row.try_get::<f64, _>(index)?),
                "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(index)?),
                _ => Value::from(row.try_get::<String, _>(index)?),
            }
        };

        out.insert(column.name().to_string(), value);
    }

    Ok(out)
}

/// Owns the process-wide connection pool.
///
/// Created once at startup and handed to whoever needs storage; there is no
/// global instance.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(settings: &Settings) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.database_url)
            .await?;

        info!(url = %settings.database_url, max_connections = settings.max_connections, "database pool ready");
        Ok(Self::from_pool(pool))
    }

    /// Wraps an already-open pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn executor(&self) -> Arc<dyn QueryExecutor> {
        Arc::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}

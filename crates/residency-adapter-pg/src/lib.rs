//! # residency-adapter-pg
//!
//! PostgreSQL implementation of every repository trait in
//! `residency-runtime`. Queries are built at runtime; filters add
//! `WHERE` fragments with numbered binds.

use std::str::FromStr;
use std::time::Duration;

use residency_core::{DatabaseConfig, PageRequest};
use residency_runtime::{SearchText, Store, StoreError};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Arguments, PgPool};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

mod catalog;
mod credits;
mod mentors;
pub mod migrate;
mod progress;
mod users;

#[derive(Debug, Error)]
pub enum PgInitError {
    #[error("no database URL configured (set DATABASE_URL or database.url)")]
    MissingUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Pooled PostgreSQL backend.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool using the configured URL and limits. Does not migrate.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PgInitError> {
        let url = config.resolve_url().ok_or(PgInitError::MissingUrl)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&url)
            .await?;
        info!(
            url = %config.redacted_url().unwrap_or_default(),
            max_connections = config.max_connections,
            "connected to postgres"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        migrate::run_migrations(&self.pool).await
    }

    pub fn into_store(self) -> Store {
        Store::from_backend(self)
    }
}

impl PgStore {
    pub(crate) async fn count_where(&self, table: &str, cond: Conditions) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {table} {}", cond.where_sql());
        let total: i64 = sqlx::query_scalar_with(&sql, cond.into_args())
            .fetch_one(self.pool())
            .await
            .map_err(map_err)?;
        Ok(count_from(total))
    }

    pub(crate) async fn select_page(
        &self,
        table: &str,
        columns: &str,
        order_by: &str,
        mut cond: Conditions,
        page: PageRequest,
    ) -> Result<Vec<PgRow>, StoreError> {
        let where_sql = cond.where_sql();
        let page_sql = cond.page_sql(page.limit, page.offset())?;
        let sql = format!("SELECT {columns} FROM {table} {where_sql} ORDER BY {order_by} {page_sql}");
        sqlx::query_with(&sql, cond.into_args())
            .fetch_all(self.pool())
            .await
            .map_err(map_err)
    }

    pub(crate) async fn delete_by_id(&self, table: &str, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }
}

pub(crate) fn map_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) => {
            // 23505: unique_violation, 23503: foreign_key_violation
            match db.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(db.message().to_string()),
                _ => StoreError::Backend(db.message().to_string()),
            }
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Serialization(err.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

/// Parse a TEXT enum column.
pub(crate) fn parse_text<T>(column: &str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::Serialization(format!("column {column}: {e}")))
}

pub(crate) fn count_from(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Accumulates `WHERE` fragments and their binds.
pub(crate) struct Conditions {
    parts: Vec<String>,
    args: PgArguments,
    next: usize,
}

impl Conditions {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            args: PgArguments::default(),
            next: 1,
        }
    }

    /// Add a fragment; `{}` inside it is replaced with the bind placeholder.
    pub fn push<T>(&mut self, fragment: &str, value: T) -> Result<(), StoreError>
    where
        T: Send + Sync + 'static,
        for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        let placeholder = format!("${}", self.next);
        self.parts.push(fragment.replace("{}", &placeholder));
        self.args
            .add(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.next += 1;
        Ok(())
    }

    pub fn push_raw(&mut self, fragment: &str) {
        self.parts.push(fragment.to_string());
    }

    /// Case-insensitive match of the search text against any of `columns`.
    pub fn search(
        &mut self,
        search: Option<&SearchText>,
        columns: &[&str],
    ) -> Result<(), StoreError> {
        let Some(search) = search else {
            return Ok(());
        };
        let placeholder = format!("${}", self.next);
        let any = columns
            .iter()
            .map(|c| format!("{c} ~* {placeholder}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.parts.push(format!("({any})"));
        self.args
            .add(search.pattern())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.next += 1;
        Ok(())
    }

    pub fn where_sql(&self) -> String {
        if self.parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.parts.join(" AND "))
        }
    }

    /// Append `LIMIT`/`OFFSET` binds and return the clause.
    pub fn page_sql(&mut self, limit: u32, offset: u64) -> Result<String, StoreError> {
        let clause = format!("LIMIT ${} OFFSET ${}", self.next, self.next + 1);
        self.args
            .add(i64::from(limit))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.args
            .add(i64::try_from(offset).unwrap_or(i64::MAX))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.next += 2;
        Ok(clause)
    }

    pub fn into_args(self) -> PgArguments {
        self.args
    }
}

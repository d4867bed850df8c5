//! Database seam
//!
//! The vector store talks to the database only through [`VectorDatabase`].
//! [`MySqlDatabase`] implements it with SQLx over the MySQL wire protocol.

use async_trait::async_trait;
use sqlvec_core::{DatabaseConfig, Result, SqlvecError};
use sqlx::mysql::{MySqlArguments, MySqlDatabaseError, MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{FromRow, MySql};

use crate::statement::{Param, SearchQuery, Statement};

/// `ER_DUP_KEYNAME`: index name already in use
const ER_DUP_KEYNAME: u16 = 1061;

/// `ER_TABLE_EXISTS_ERROR`
const ER_TABLE_EXISTS: u16 = 1050;

/// A raw search row before it is shaped into a document
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct SearchRow {
    pub content: Option<String>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub distance: Option<f64>,
}

/// Trait for the statements a vector store needs executed
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Execute a statement returning no rows; yields the affected row count
    async fn execute(&self, statement: &Statement) -> Result<u64>;

    /// Execute an insert and return the generated id
    async fn insert(&self, statement: &Statement) -> Result<i64>;

    /// Run a nearest-neighbour query
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchRow>>;
}

/// MySQL-protocol database
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    /// Create a new connection pool
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| SqlvecError::DatabaseError(format!("MySQL connection failed: {e}")))?;

        tracing::info!(max_connections, "Connected to vector database");
        Ok(Self { pool })
    }

    /// Create from config
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.url, config.pool_size).await
    }

    /// Create from an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn bind_params(
    mut query: Query<'_, MySql, MySqlArguments>,
    params: Vec<Param>,
) -> Query<'_, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Param::Int(value) => query.bind(value),
            Param::Text(value) => query.bind(value),
            Param::OptText(value) => query.bind(value),
        };
    }
    query
}

/// Map a driver error, keeping "already exists" distinguishable
fn map_db_error(err: sqlx::Error, context: &str) -> SqlvecError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mysql_err) = db_err.try_downcast_ref::<MySqlDatabaseError>() {
            if matches!(mysql_err.number(), ER_DUP_KEYNAME | ER_TABLE_EXISTS) {
                return SqlvecError::AlreadyExists(mysql_err.message().to_string());
            }
        }
    }
    SqlvecError::DatabaseError(format!("{context}: {err}"))
}

#[async_trait]
impl VectorDatabase for MySqlDatabase {
    async fn execute(&self, statement: &Statement) -> Result<u64> {
        let sql = statement.sql();
        tracing::debug!(kind = statement.kind(), %sql, "Executing statement");

        let result = bind_params(sqlx::query(&sql), statement.params())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, &format!("Failed to execute {}", statement.kind())))?;

        Ok(result.rows_affected())
    }

    async fn insert(&self, statement: &Statement) -> Result<i64> {
        let sql = statement.sql();
        tracing::debug!(kind = statement.kind(), %sql, "Executing insert");

        let result = bind_params(sqlx::query(&sql), statement.params())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, &format!("Failed to execute {}", statement.kind())))?;

        i64::try_from(result.last_insert_id()).map_err(|_| {
            SqlvecError::DatabaseError(format!(
                "Generated id out of range: {}",
                result.last_insert_id()
            ))
        })
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchRow>> {
        let sql = query.sql();
        tracing::debug!(%sql, limit = query.limit, "Executing vector search");

        let rows = bind_params(sqlx::query(&sql), query.params())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Vector search failed"))?;

        rows.iter()
            .map(|row| {
                SearchRow::from_row(row).map_err(|e| {
                    SqlvecError::DatabaseError(format!("Failed to decode search row: {e}"))
                })
            })
            .collect()
    }
}

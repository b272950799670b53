use crate::config::Config;
use crate::error::DBError;
use async_trait::async_trait;
use biodome_core::{StatusMessage, TokenMessage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

macro_rules! sql_stmnt {
    ($ret:ident, $stmt:expr) => {
        sqlx::query_as::<_, $ret>($stmt)
    };
    ($stmt:expr) => {
        sqlx::query($stmt)
    };
    ($ret:ident, $stmt:expr, $($bind:expr),*) => {
        sqlx::query_as::<_, $ret>($stmt)$(.bind($bind))*
    };
    ($stmt:expr, $($bind:expr),*) => {
        sqlx::query($stmt)$(.bind($bind))*
    };
}

/// Builds the shared pool.
///
/// Connections are opened on first use, so an unreachable database only
/// degrades the service instead of preventing the start.
pub fn establish_db_connection(config: &Config) -> Result<PgPool, DBError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .idle_timeout(config.db_idle_timeout())
        .acquire_timeout(config.db_acquire_timeout())
        .connect_lazy(config.database_url())?;
    Ok(pool)
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(sqlx::FromRow)]
struct NowRecord {
    now: DateTime<Utc>,
}

/// Round trip to the database, never fails
pub async fn health_check(conn: &PgPool) -> DatabaseHealth {
    match sql_stmnt!(NowRecord, "SELECT NOW() AS now")
        .fetch_one(conn)
        .await
    {
        Ok(record) => DatabaseHealth {
            ok: true,
            timestamp: Some(record.now),
            error: None,
        },
        Err(e) => DatabaseHealth {
            ok: false,
            timestamp: None,
            error: Some(e.to_string()),
        },
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CountRecord {
    pub count: Option<i64>,
}

impl CountRecord {
    pub fn count(self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// Identity of a freshly inserted row
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct InsertedRecord {
    pub id: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Write side of the persistence gateway, as used by the pollers
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn store_sensor_reading(&self, status: &StatusMessage)
        -> Result<InsertedRecord, DBError>;

    /// Returns `None` if the same text was stored before
    async fn store_verdant_output(
        &self,
        sol_day: Option<i32>,
        text: &str,
    ) -> Result<Option<i32>, DBError>;

    async fn store_token_metrics(&self, token: &TokenMessage) -> Result<InsertedRecord, DBError>;
}

#[async_trait]
impl Recorder for PgPool {
    async fn store_sensor_reading(
        &self,
        status: &StatusMessage,
    ) -> Result<InsertedRecord, DBError> {
        sensor_reading::insert(self, status).await
    }

    async fn store_verdant_output(
        &self,
        sol_day: Option<i32>,
        text: &str,
    ) -> Result<Option<i32>, DBError> {
        verdant_output::insert(self, sol_day, text).await
    }

    async fn store_token_metrics(&self, token: &TokenMessage) -> Result<InsertedRecord, DBError> {
        token_metrics::insert(self, token).await
    }
}

pub mod aggregate;
pub mod schema;
pub mod sensor_reading;
pub mod token_metrics;
pub mod verdant_output;

#[cfg(test)]
mod test;

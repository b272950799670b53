use biodome_core::TokenMessage;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::InsertedRecord;
use crate::error::DBError;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct TokenMetricsDao {
    pub(crate) id: i32,
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) market_cap_sol: Option<f64>,
    pub(crate) market_cap_usd: Option<f64>,
    pub(crate) ath_market_cap: Option<f64>,
    pub(crate) num_participants: Option<i64>,
    pub(crate) reply_count: Option<i64>,
    pub(crate) is_graduated: bool,
}

pub async fn insert(
    conn: &sqlx::PgPool,
    token: &TokenMessage,
) -> Result<InsertedRecord, DBError> {
    Ok(sql_stmnt!(
        InsertedRecord,
        r#"INSERT INTO token_metrics
            (market_cap_sol, market_cap_usd, ath_market_cap, num_participants, reply_count, is_graduated)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, recorded_at"#,
        token.market_cap,
        token.usd_market_cap,
        token.ath_market_cap,
        token.num_participants,
        token.reply_count,
        token.complete
    )
    .fetch_one(conn)
    .await?)
}

pub async fn get_latest(conn: &sqlx::PgPool) -> Result<Option<TokenMetricsDao>, DBError> {
    Ok(sql_stmnt!(
        TokenMetricsDao,
        r#"SELECT * FROM token_metrics
            ORDER BY recorded_at DESC, id DESC LIMIT 1"#
    )
    .fetch_optional(conn)
    .await?)
}

/// Token rows of the trailing `hours`, oldest first
pub async fn get(conn: &sqlx::PgPool, hours: i32) -> Result<Vec<TokenMetricsDao>, DBError> {
    Ok(sql_stmnt!(
        TokenMetricsDao,
        r#"SELECT * FROM token_metrics
            WHERE recorded_at > NOW() - ($1::int * INTERVAL '1 hour')
            ORDER BY recorded_at ASC"#,
        hours
    )
    .fetch_all(conn)
    .await?)
}

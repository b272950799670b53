use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::DBError;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct VerdantOutputDao {
    pub(crate) id: i32,
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) sol_day: Option<i32>,
    pub(crate) output_text: String,
    pub(crate) output_hash: String,
}

impl VerdantOutputDao {
    pub fn output_text(&self) -> &str {
        &self.output_text
    }
}

#[derive(sqlx::FromRow)]
struct IdRecord {
    id: i32,
}

/// Lower-case hex SHA-256 of the text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Returns the new id, or `None` if the text is already stored
pub async fn insert(
    conn: &sqlx::PgPool,
    sol_day: Option<i32>,
    text: &str,
) -> Result<Option<i32>, DBError> {
    let record = sql_stmnt!(
        IdRecord,
        r#"INSERT INTO verdant_outputs (sol_day, output_text, output_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (output_hash) DO NOTHING
            RETURNING id"#,
        sol_day,
        text,
        content_hash(text)
    )
    .fetch_optional(conn)
    .await?;
    Ok(record.map(|r| r.id))
}

pub async fn get_latest(conn: &sqlx::PgPool) -> Result<Option<VerdantOutputDao>, DBError> {
    Ok(sql_stmnt!(
        VerdantOutputDao,
        r#"SELECT id, recorded_at, sol_day, output_text, output_hash
            FROM verdant_outputs
            ORDER BY recorded_at DESC, id DESC LIMIT 1"#
    )
    .fetch_optional(conn)
    .await?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_content_hash() {
        assert_eq!(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            content_hash("")
        );
        let hash = content_hash("The canopy is thriving.");
        assert_eq!(64, hash.len());
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, content_hash("The canopy is thriving."));
        assert_ne!(hash, content_hash("The canopy is thriving"));
    }
}

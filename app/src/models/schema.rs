use sqlx::PgPool;
use tracing::{info, warn};

const SCHEMA: &str = include_str!("../../../database/schema.sql");

/// The statements of `database/schema.sql`, comments stripped
pub fn statements() -> Vec<String> {
    SCHEMA
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_owned()
        })
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

/// Applies the schema statement by statement.
///
/// A failing statement is logged and skipped, the remaining ones are still
/// applied. Returns the number of statements that succeeded.
pub async fn initialize(conn: &PgPool) -> usize {
    let statements = statements();
    let mut applied = 0;
    for stmt in statements.iter() {
        match sqlx::query(stmt).execute(conn).await {
            Ok(_) => applied += 1,
            Err(e) => warn!("Schema statement failed, skipping: {}", e),
        }
    }

    if applied == statements.len() {
        info!("Database schema initialized");
    } else {
        warn!(
            "Database schema partially initialized ({}/{})",
            applied,
            statements.len()
        );
    }
    applied
}

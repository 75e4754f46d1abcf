use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{DbError, TableCount};

/// Row counts for arbitrary tables, by name.
#[derive(Clone)]
pub struct TableStatsRepository {
    pool: PgPool,
}

impl TableStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn count_rows(&self, table: &str) -> Result<TableCount, DbError> {
        // Identifiers can't be bound as parameters, so only plain names are interpolated
        if !is_plain_identifier(table) {
            return Err(DbError::InvalidTableName(table.to_string()));
        }

        let sql = format!(r#"SELECT COUNT(*) FROM "{table}""#);
        let rows: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await?;

        debug!("{} holds {} rows", table, rows);
        Ok(TableCount {
            table: table.to_string(),
            rows,
        })
    }
}

/// Lowercase ASCII letters, digits and underscores, not starting with a digit.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

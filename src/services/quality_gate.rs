use tracing::{error, info, instrument};

use crate::db::{DbError, TableCount, TableStatsRepository, DAILY_SUMMARY_TABLE, RAW_WEATHER_TABLE};

/// Tables that must hold rows once a pipeline run has finished.
pub const MONITORED_TABLES: [&str; 2] = [RAW_WEATHER_TABLE, DAILY_SUMMARY_TABLE];

#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    #[error("Quality gate FAILED: {table} has 0 rows")]
    EmptyTable { table: String },
    #[error("Quality gate cannot check {0:?}: not a plain table name")]
    InvalidTableName(String),
    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for QualityError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidTableName(name) => QualityError::InvalidTableName(name),
            other => QualityError::Db(other),
        }
    }
}

/// Post-run check that catches total pipeline failure, not per-row defects.
#[derive(Clone)]
pub struct QualityGate {
    table_stats: TableStatsRepository,
}

impl QualityGate {
    pub fn new(table_stats: TableStatsRepository) -> Self {
        Self { table_stats }
    }

    /// Fails on the first table with zero rows, naming it.
    #[instrument(skip(self))]
    pub async fn check(&self, tables: &[&str]) -> Result<Vec<TableCount>, QualityError> {
        let mut counts = Vec::with_capacity(tables.len());

        for table in tables {
            let count = self.table_stats.count_rows(table).await?;
            info!("Quality check - {}: {} rows", count.table, count.rows);

            if count.rows == 0 {
                error!("Quality gate failed for {}", table);
                return Err(QualityError::EmptyTable {
                    table: table.to_string(),
                });
            }
            counts.push(count);
        }

        info!("All quality checks passed");
        Ok(counts)
    }
}

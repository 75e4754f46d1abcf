use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{DailySummary, DbError};

pub const DAILY_SUMMARY_TABLE: &str = "daily_summary";

#[derive(Clone)]
pub struct SummaryRepository {
    pool: PgPool,
}

impl SummaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the whole of daily_summary with a fresh derivation from raw_weather.
    ///
    /// The delete and the re-insert share a transaction, so readers see either the
    /// previous summary or the new one. The arithmetic mirrors
    /// `DailySummary::from_observation`.
    #[instrument(skip(self))]
    pub async fn rebuild_from_raw(&self) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM daily_summary")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        debug!("Cleared {} previous daily_summary rows", removed);

        let written = sqlx::query(
            r#"
            INSERT INTO daily_summary (city, date, avg_temperature, total_precipitation, max_windspeed)
            SELECT city,
                   date,
                   (temperature_max + temperature_min) / 2.0,
                   precipitation,
                   windspeed_max
            FROM raw_weather
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        info!("Rebuilt daily_summary with {} rows", written);
        Ok(written)
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<DailySummary>, DbError> {
        let summaries = sqlx::query_as::<_, DailySummary>(
            r#"
            SELECT city, date, avg_temperature, total_precipitation, max_windspeed
            FROM daily_summary
            ORDER BY city, date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} daily summaries", summaries.len());
        Ok(summaries)
    }
}

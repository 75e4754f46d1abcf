use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

use crate::db::{DbError, RawObservation};

pub const RAW_WEATHER_TABLE: &str = "raw_weather";

// Postgres caps a statement at 65535 bind parameters; each row binds 6
const MAX_ROWS_PER_STATEMENT: usize = u16::MAX as usize / 6;

#[derive(Clone)]
pub struct ObservationRepository {
    pool: PgPool,
}

impl ObservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert observations, skipping any whose (city, date) already exists.
    ///
    /// Runs in a single transaction: either every non-conflicting row commits or
    /// none do. Returns the number of rows actually inserted.
    #[instrument(skip(self, observations), fields(count = observations.len()))]
    pub async fn insert_observations(
        &self,
        observations: &[RawObservation],
    ) -> Result<u64, DbError> {
        if observations.is_empty() {
            debug!("No observations to insert");
            return Ok(0);
        }

        debug!(
            "Beginning transaction to insert {} observations",
            observations.len()
        );
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in observations.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO raw_weather \
                 (city, date, temperature_max, temperature_min, precipitation, windspeed_max) ",
            );
            builder.push_values(chunk, |mut row, observation| {
                row.push_bind(observation.city.clone())
                    .push_bind(observation.date)
                    .push_bind(observation.temperature_max)
                    .push_bind(observation.temperature_min)
                    .push_bind(observation.precipitation)
                    .push_bind(observation.windspeed_max);
            });
            builder.push(" ON CONFLICT (city, date) DO NOTHING");

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        let skipped = observations.len() as u64 - inserted;
        info!(
            "Inserted {} new observations into raw_weather, {} duplicates skipped",
            inserted, skipped
        );
        Ok(inserted)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_weather")
            .fetch_one(&self.pool)
            .await?;
        debug!("raw_weather holds {} rows", count);
        Ok(count)
    }

    /// All stored observations ordered by city then date
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<RawObservation>, DbError> {
        let observations = sqlx::query_as::<_, RawObservation>(
            r#"
            SELECT city, date, temperature_max, temperature_min, precipitation, windspeed_max
            FROM raw_weather
            ORDER BY city, date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} observations", observations.len());
        Ok(observations)
    }
}

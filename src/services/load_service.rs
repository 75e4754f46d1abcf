use serde::Serialize;
use tracing::{error, info, instrument};

use crate::db::{DbError, ObservationRepository, RawObservation};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Data quality gate FAILED: raw_weather is empty after load")]
    EmptyAfterLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub attempted: usize,
    pub inserted: u64,
    pub skipped: u64,
    pub total_rows: i64,
}

/// Idempotent load of raw observations with its post-load emptiness check.
#[derive(Clone)]
pub struct LoadService {
    observation_repo: ObservationRepository,
}

impl LoadService {
    pub fn new(observation_repo: ObservationRepository) -> Self {
        Self { observation_repo }
    }

    /// Insert-or-skip the batch, then require that raw_weather is not empty.
    ///
    /// Safe to repeat with overlapping batches: existing (city, date) keys are
    /// left untouched and only count towards `skipped`.
    #[instrument(skip(self, observations), fields(count = observations.len()))]
    pub async fn load(&self, observations: &[RawObservation]) -> Result<LoadReport, LoadError> {
        let inserted = self.observation_repo.insert_observations(observations).await?;
        let total_rows = self.observation_repo.count().await?;
        info!("raw_weather total rows: {}", total_rows);

        if total_rows == 0 {
            error!("raw_weather is empty after load");
            return Err(LoadError::EmptyAfterLoad);
        }

        let attempted = observations.len();
        Ok(LoadReport {
            attempted,
            inserted,
            skipped: attempted as u64 - inserted,
            total_rows,
        })
    }
}

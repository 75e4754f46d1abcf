use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info, instrument, warn};

use crate::db::{
    DbError, ObservationRepository, RawObservation, SummaryRepository, TableCount,
    TableStatsRepository,
};
use crate::fetch_error::FetchError;
use crate::fetcher::{DailySeries, ForecastFetcher, ForecastResponse};
use crate::normalizer::{normalize, NormalizeError};
use crate::services::load_service::{LoadError, LoadReport};
use crate::services::quality_gate::{QualityError, MONITORED_TABLES};
use crate::services::{LoadService, QualityGate};

const RAW_DATA_KEY: &str = "raw_data";
const RAW_OBSERVATIONS_KEY: &str = "raw_observations";

/// The five tasks of a run, in the only order they ever execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Extract,
    Transform,
    LoadRaw,
    #[serde(rename = "dbt_run")]
    Aggregate,
    QualityCheck,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 5] = [
        PipelineStep::Extract,
        PipelineStep::Transform,
        PipelineStep::LoadRaw,
        PipelineStep::Aggregate,
        PipelineStep::QualityCheck,
    ];

    pub fn task_id(&self) -> &'static str {
        match self {
            PipelineStep::Extract => "extract",
            PipelineStep::Transform => "transform",
            PipelineStep::LoadRaw => "load_raw",
            PipelineStep::Aggregate => "dbt_run",
            PipelineStep::QualityCheck => "quality_check",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PipelineStep::Extract => "Fetch the trailing week of daily forecast data",
            PipelineStep::Transform => "Normalize the response into raw observation rows",
            PipelineStep::LoadRaw => {
                "Insert rows into raw_weather, skipping existing (city, date) keys"
            }
            PipelineStep::Aggregate => "Rebuild daily_summary from raw_weather",
            PipelineStep::QualityCheck => "Require raw_weather and daily_summary to have rows",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task_id())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Aggregate(#[from] DbError),
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error("No handoff value under {0:?}")]
    MissingHandoff(String),
    #[error("Handoff value could not be (de)serialized: {0}")]
    Handoff(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Task {step} failed: {source}")]
    StepFailed { step: PipelineStep, source: StepError },
}

impl PipelineError {
    pub fn step(&self) -> PipelineStep {
        match self {
            PipelineError::StepFailed { step, .. } => *step,
        }
    }
}

/// Serialized values passed from one task to the next within a single run.
#[derive(Debug, Default)]
pub struct TaskHandoff {
    values: HashMap<String, serde_json::Value>,
}

impl TaskHandoff {
    pub fn push<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StepError> {
        self.values
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn pull<T: DeserializeOwned>(&self, key: &str) -> Result<T, StepError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| StepError::MissingHandoff(key.to_string()))?;
        Ok(T::deserialize(value)?)
    }
}

/// State of one pipeline invocation. Built fresh for every run and dropped after it.
#[derive(Debug)]
pub struct PipelineRun {
    started_at: DateTime<Utc>,
    tasks: Vec<PipelineStep>,
    handoff: TaskHandoff,
    completed: Vec<PipelineStep>,
    days_fetched: usize,
    load: Option<LoadReport>,
    summary_rows: u64,
    table_counts: Vec<TableCount>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            tasks: PipelineStep::ALL.to_vec(),
            handoff: TaskHandoff::default(),
            completed: Vec::new(),
            days_fetched: 0,
            load: None,
            summary_rows: 0,
            table_counts: Vec::new(),
        }
    }

    fn into_report(self) -> RunReport {
        let load = self.load.unwrap_or(LoadReport {
            attempted: 0,
            inserted: 0,
            skipped: 0,
            total_rows: 0,
        });
        RunReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            completed_steps: self.completed,
            days_fetched: self.days_fetched,
            inserted: load.inserted,
            skipped: load.skipped,
            total_raw_rows: load.total_rows,
            summary_rows: self.summary_rows,
            table_counts: self.table_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed_steps: Vec<PipelineStep>,
    pub days_fetched: usize,
    pub inserted: u64,
    pub skipped: u64,
    pub total_raw_rows: i64,
    pub summary_rows: u64,
    pub table_counts: Vec<TableCount>,
}

/// Runs extract → transform → load_raw → dbt_run → quality_check, stopping at
/// the first failure. Re-running after a failure is always safe.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: ForecastFetcher,
    load_service: LoadService,
    summary_repo: SummaryRepository,
    quality_gate: QualityGate,
}

impl Pipeline {
    pub fn new(fetcher: ForecastFetcher, pool: PgPool) -> Self {
        Self {
            fetcher,
            load_service: LoadService::new(ObservationRepository::new(pool.clone())),
            summary_repo: SummaryRepository::new(pool.clone()),
            quality_gate: QualityGate::new(TableStatsRepository::new(pool)),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let mut run = PipelineRun::new();
        info!("Starting pipeline run with {} tasks", run.tasks.len());

        for step in run.tasks.clone() {
            let started = Instant::now();
            info!("Task {} starting", step);

            if let Err(source) = self.execute(step, &mut run).await {
                error!("Task {} failed after {:?}: {}", step, started.elapsed(), source);
                return Err(PipelineError::StepFailed { step, source });
            }

            run.completed.push(step);
            info!("Task {} complete in {:?}", step, started.elapsed());
        }

        let report = run.into_report();
        info!(
            "Pipeline run complete: {} days fetched, {} inserted, {} skipped, {} summary rows",
            report.days_fetched, report.inserted, report.skipped, report.summary_rows
        );
        Ok(report)
    }

    async fn execute(&self, step: PipelineStep, run: &mut PipelineRun) -> Result<(), StepError> {
        match step {
            PipelineStep::Extract => {
                let response = self.fetcher.fetch_forecast().await?;
                run.days_fetched = response.daily.as_ref().map_or(0, DailySeries::day_count);
                run.handoff.push(RAW_DATA_KEY, &response)?;
            }
            PipelineStep::Transform => {
                let response: ForecastResponse = run.handoff.pull(RAW_DATA_KEY)?;
                let normalized = normalize(&response, &self.fetcher.location().city)?;
                if normalized.is_empty() {
                    warn!("Forecast response contained no days");
                }
                // daily_summary is rebuilt from storage by the aggregate task
                run.handoff
                    .push(RAW_OBSERVATIONS_KEY, &normalized.observations)?;
            }
            PipelineStep::LoadRaw => {
                let observations: Vec<RawObservation> = run.handoff.pull(RAW_OBSERVATIONS_KEY)?;
                run.load = Some(self.load_service.load(&observations).await?);
            }
            PipelineStep::Aggregate => {
                run.summary_rows = self.summary_repo.rebuild_from_raw().await?;
            }
            PipelineStep::QualityCheck => {
                run.table_counts = self.quality_gate.check(&MONITORED_TABLES).await?;
            }
        }
        Ok(())
    }
}

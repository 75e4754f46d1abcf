use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::{
    ChartPoint, ChartSeries, DailySummary, DashboardCharts, DashboardSnapshot,
    ObservationRepository, RawObservation, SummaryRepository,
};
use crate::pipeline::PipelineStep;

/// Read model behind the monitoring dashboard.
///
/// A poll that fails keeps the previously fetched rows and records the error
/// for display; it never clears data or stops the poller.
#[derive(Clone)]
pub struct DashboardService {
    observation_repo: ObservationRepository,
    summary_repo: SummaryRepository,
    state: Arc<RwLock<DashboardState>>,
}

impl DashboardService {
    pub fn new(observation_repo: ObservationRepository, summary_repo: SummaryRepository) -> Self {
        Self {
            observation_repo,
            summary_repo,
            state: Arc::new(RwLock::new(DashboardState::default())),
        }
    }

    /// Re-read both tables. Returns whether the poll succeeded.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let result = async {
            let raw = self.observation_repo.list_all().await?;
            let summary = self.summary_repo.list_all().await?;
            Ok::<_, crate::db::DbError>((raw, summary))
        }
        .await;

        let mut state = self.state.write().await;
        match result {
            Ok((raw, summary)) => {
                info!(
                    "Dashboard refreshed: {} raw rows, {} summary rows",
                    raw.len(),
                    summary.len()
                );
                state.record_success(raw, summary, Utc::now());
                true
            }
            Err(e) => {
                warn!("Dashboard refresh failed, keeping previous data: {}", e);
                state.record_failure(e.to_string(), Utc::now());
                false
            }
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn raw_weather(&self) -> Vec<RawObservation> {
        self.state.read().await.raw_weather.clone()
    }

    pub async fn daily_summary(&self) -> Vec<DailySummary> {
        self.state.read().await.daily_summary.clone()
    }

    pub async fn charts(&self) -> DashboardCharts {
        let state = self.state.read().await;
        build_charts(&state.raw_weather, &state.daily_summary)
    }
}

#[derive(Debug, Default, Clone)]
pub struct DashboardState {
    raw_weather: Vec<RawObservation>,
    daily_summary: Vec<DailySummary>,
    last_refreshed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn record_success(
        &mut self,
        raw_weather: Vec<RawObservation>,
        daily_summary: Vec<DailySummary>,
        at: DateTime<Utc>,
    ) {
        self.raw_weather = raw_weather;
        self.daily_summary = daily_summary;
        self.last_refreshed_at = Some(at);
        self.error = None;
    }

    pub fn record_failure(&mut self, error: String, at: DateTime<Utc>) {
        self.error = Some(error);
        self.last_error_at = Some(at);
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            raw_weather: self.raw_weather.clone(),
            daily_summary: self.daily_summary.clone(),
            last_refreshed_at: self.last_refreshed_at,
            error: self.error.clone(),
            last_error_at: self.last_error_at,
        }
    }
}

/// Per-city, per-metric date series for the raw and summary tables.
pub fn build_charts(raw: &[RawObservation], summary: &[DailySummary]) -> DashboardCharts {
    let raw_metrics: [(&str, fn(&RawObservation) -> Option<f64>); 4] = [
        ("temperature_max", |r| r.temperature_max),
        ("temperature_min", |r| r.temperature_min),
        ("precipitation", |r| Some(r.precipitation)),
        ("windspeed_max", |r| r.windspeed_max),
    ];
    let summary_metrics: [(&str, fn(&DailySummary) -> Option<f64>); 3] = [
        ("avg_temperature", |s| s.avg_temperature),
        ("total_precipitation", |s| Some(s.total_precipitation)),
        ("max_windspeed", |s| s.max_windspeed),
    ];

    let charts = DashboardCharts {
        raw_weather: series_by_city(raw, |r| (&r.city, r.date), &raw_metrics),
        daily_summary: series_by_city(summary, |s| (&s.city, s.date), &summary_metrics),
    };
    debug!(
        "Built {} raw and {} summary chart series",
        charts.raw_weather.len(),
        charts.daily_summary.len()
    );
    charts
}

fn series_by_city<T>(
    rows: &[T],
    key: impl Fn(&T) -> (&String, chrono::NaiveDate),
    metrics: &[(&str, fn(&T) -> Option<f64>)],
) -> Vec<ChartSeries> {
    let mut by_city: BTreeMap<&String, Vec<&T>> = BTreeMap::new();
    for row in rows {
        by_city.entry(key(row).0).or_default().push(row);
    }

    let mut series = Vec::new();
    for (city, mut city_rows) in by_city {
        city_rows.sort_by_key(|row| key(*row).1);
        for (metric, value) in metrics {
            series.push(ChartSeries {
                city: city.clone(),
                metric: metric.to_string(),
                points: city_rows
                    .iter()
                    .map(|row| ChartPoint {
                        date: key(*row).1,
                        value: value(*row),
                    })
                    .collect(),
            });
        }
    }
    series
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArchitectureNode {
    pub id: String,
    pub label: String,
    pub kind: String,
    /// Column names for `table` nodes, empty otherwise.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArchitectureEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlowStep {
    pub task_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArchitectureView {
    pub nodes: Vec<ArchitectureNode>,
    pub edges: Vec<ArchitectureEdge>,
    pub flow: Vec<FlowStep>,
}

const RAW_WEATHER_COLUMNS: [&str; 8] = [
    "id",
    "city",
    "date",
    "temperature_max",
    "temperature_min",
    "precipitation",
    "windspeed_max",
    "created_at",
];

const DAILY_SUMMARY_COLUMNS: [&str; 6] = [
    "city",
    "date",
    "avg_temperature",
    "total_precipitation",
    "max_windspeed",
    "created_at",
];

/// Static description of the pipeline; needs no database.
pub fn architecture() -> ArchitectureView {
    let node = |id: &str, label: &str, kind: &str| ArchitectureNode {
        id: id.to_string(),
        label: label.to_string(),
        kind: kind.to_string(),
        columns: Vec::new(),
    };
    let table = |id: &str, label: &str, columns: &[&str]| ArchitectureNode {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        ..node(id, label, "table")
    };
    let edge = |from: &str, to: &str| ArchitectureEdge {
        from: from.to_string(),
        to: to.to_string(),
    };

    ArchitectureView {
        nodes: vec![
            node("forecast_api", "Open-Meteo API", "source"),
            node("extract", "Fetcher", "task"),
            node("transform", "Normalizer", "task"),
            node("load_raw", "Idempotent loader", "task"),
            table(
                "raw_weather",
                "raw_weather (PostgreSQL)",
                &RAW_WEATHER_COLUMNS,
            ),
            node("dbt_run", "Aggregator", "task"),
            table(
                "daily_summary",
                "daily_summary (PostgreSQL)",
                &DAILY_SUMMARY_COLUMNS,
            ),
            node("quality_check", "Quality gate", "task"),
        ],
        edges: vec![
            edge("forecast_api", "extract"),
            edge("extract", "transform"),
            edge("transform", "load_raw"),
            edge("load_raw", "raw_weather"),
            edge("raw_weather", "dbt_run"),
            edge("dbt_run", "daily_summary"),
            edge("daily_summary", "quality_check"),
        ],
        flow: PipelineStep::ALL
            .iter()
            .map(|step| FlowStep {
                task_id: step.task_id().to_string(),
                description: step.description().to_string(),
            })
            .collect(),
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Row of the raw_weather table; also the normalizer's output shape
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct RawObservation {
    pub city: String,
    pub date: NaiveDate,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    /// Millimetres. Never null: a missing upstream value means no rain.
    pub precipitation: f64,
    pub windspeed_max: Option<f64>,
}

// Row of the daily_summary table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct DailySummary {
    pub city: String,
    pub date: NaiveDate,
    pub avg_temperature: Option<f64>,
    pub total_precipitation: f64,
    pub max_windspeed: Option<f64>,
}

impl DailySummary {
    /// Derive the summary for one observation.
    ///
    /// `avg_temperature` is null when either temperature is null; nulls are not
    /// defaulted here, matching how SQL arithmetic treats them in the rebuild.
    pub fn from_observation(observation: &RawObservation) -> Self {
        let avg_temperature = match (observation.temperature_max, observation.temperature_min) {
            (Some(max), Some(min)) => Some((max + min) / 2.0),
            _ => None,
        };

        Self {
            city: observation.city.clone(),
            date: observation.date,
            avg_temperature,
            total_precipitation: observation.precipitation,
            max_windspeed: observation.windspeed_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

// API response DTOs
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSnapshot {
    pub raw_weather: Vec<RawObservation>,
    pub daily_summary: Vec<DailySummary>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Banner text for the most recent failed poll; cleared on the next success.
    pub error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartSeries {
    pub city: String,
    pub metric: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardCharts {
    pub raw_weather: Vec<ChartSeries>,
    pub daily_summary: Vec<ChartSeries>,
}

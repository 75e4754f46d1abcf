use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::db::{DailySummary, RawObservation};
use crate::fetcher::{
    ForecastResponse, PRECIPITATION_SERIES, TEMPERATURE_MAX_SERIES, TEMPERATURE_MIN_SERIES,
    WINDSPEED_MAX_SERIES,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("Forecast response has no `daily` section")]
    MissingDaily,
    #[error("Forecast response is missing the `{0}` series")]
    MissingSeries(&'static str),
    #[error("Series `{series}` has {actual} values but `time` has {expected}")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid date {value:?} at index {index}")]
    InvalidDate { index: usize, value: String },
}

/// The two row-aligned tables derived from one forecast response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedForecast {
    pub observations: Vec<RawObservation>,
    pub summaries: Vec<DailySummary>,
}

impl NormalizedForecast {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Turn a forecast response into raw observations and their daily summaries.
///
/// Row `i` of every series belongs to `time[i]`; all series must match the
/// length of `time`. A missing precipitation value means no rain and becomes
/// `0.0`; missing temperatures and windspeeds stay null.
#[instrument(skip(response))]
pub fn normalize(
    response: &ForecastResponse,
    city: &str,
) -> Result<NormalizedForecast, NormalizeError> {
    let daily = response.daily.as_ref().ok_or(NormalizeError::MissingDaily)?;

    let time = daily
        .time
        .as_deref()
        .ok_or(NormalizeError::MissingSeries("time"))?;
    let expected = time.len();

    let temperature_max = aligned_series(
        TEMPERATURE_MAX_SERIES,
        daily.temperature_2m_max.as_deref(),
        expected,
    )?;
    let temperature_min = aligned_series(
        TEMPERATURE_MIN_SERIES,
        daily.temperature_2m_min.as_deref(),
        expected,
    )?;
    let precipitation = aligned_series(
        PRECIPITATION_SERIES,
        daily.precipitation_sum.as_deref(),
        expected,
    )?;
    let windspeed_max = aligned_series(
        WINDSPEED_MAX_SERIES,
        daily.windspeed_10m_max.as_deref(),
        expected,
    )?;

    let observations = time
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Ok(RawObservation {
                city: city.to_string(),
                date: parse_date(index, value)?,
                temperature_max: temperature_max[index],
                temperature_min: temperature_min[index],
                precipitation: precipitation[index].unwrap_or(0.0),
                windspeed_max: windspeed_max[index],
            })
        })
        .collect::<Result<Vec<_>, NormalizeError>>()?;
    info!("Transformed {} rows into raw observations", observations.len());

    let summaries: Vec<DailySummary> = observations
        .iter()
        .map(DailySummary::from_observation)
        .collect();
    info!("Built {} daily summaries", summaries.len());

    Ok(NormalizedForecast {
        observations,
        summaries,
    })
}

fn aligned_series<'a>(
    name: &'static str,
    series: Option<&'a [Option<f64>]>,
    expected: usize,
) -> Result<&'a [Option<f64>], NormalizeError> {
    let series = series.ok_or(NormalizeError::MissingSeries(name))?;
    if series.len() != expected {
        return Err(NormalizeError::LengthMismatch {
            series: name,
            expected,
            actual: series.len(),
        });
    }
    Ok(series)
}

fn parse_date(index: usize, value: &str) -> Result<NaiveDate, NormalizeError> {
    // Accept full ISO datetimes too and keep the calendar date
    let date_part = value.split('T').next().unwrap_or(value).trim();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
        debug!("Failed to parse date at index {}: {}", index, e);
        NormalizeError::InvalidDate {
            index,
            value: value.to_string(),
        }
    })
}

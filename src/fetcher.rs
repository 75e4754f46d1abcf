use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::fetch_error::FetchError;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const PAST_DAYS: u32 = 7;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const TEMPERATURE_MAX_SERIES: &str = "temperature_2m_max";
pub const TEMPERATURE_MIN_SERIES: &str = "temperature_2m_min";
pub const PRECIPITATION_SERIES: &str = "precipitation_sum";
pub const WINDSPEED_MAX_SERIES: &str = "windspeed_10m_max";

/// Daily series requested from the forecast API, in request order.
pub const DAILY_SERIES: [&str; 4] = [
    TEMPERATURE_MAX_SERIES,
    TEMPERATURE_MIN_SERIES,
    PRECIPITATION_SERIES,
    WINDSPEED_MAX_SERIES,
];

/// The single place this deployment collects weather for.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Location {
    pub fn singapore() -> Self {
        Self {
            city: "Singapore".to_string(),
            latitude: 1.29,
            longitude: 103.85,
            timezone: "Asia/Singapore".to_string(),
        }
    }
}

/// Decoded forecast API response.
///
/// Every field is optional so that a malformed upstream payload still decodes
/// and the normalizer can report exactly which part is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub daily: Option<DailySeries>,
}

/// Parallel per-day arrays keyed by series name. Individual values may be null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    pub time: Option<Vec<String>>,
    pub temperature_2m_max: Option<Vec<Option<f64>>>,
    pub temperature_2m_min: Option<Vec<Option<f64>>>,
    pub precipitation_sum: Option<Vec<Option<f64>>>,
    pub windspeed_10m_max: Option<Vec<Option<f64>>>,
}

impl DailySeries {
    pub fn day_count(&self) -> usize {
        self.time.as_ref().map_or(0, Vec::len)
    }
}

/// Bounded exponential backoff applied to transient fetch failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 1s -> 2s -> 4s
        Self {
            max_retries: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_retries)
    }
}

#[derive(Clone)]
pub struct ForecastFetcher {
    client: reqwest::Client,
    url: String,
    location: Location,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl ForecastFetcher {
    pub fn new(url: String, location: Location) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url,
            location,
            retry_policy: RetryPolicy::default(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Per-attempt timeout covering connect, response and body. Defaults to `REQUEST_TIMEOUT`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Fetch the trailing `PAST_DAYS` of daily series for the configured location.
    ///
    /// Transient failures are retried per the retry policy; exhausted retries and
    /// non-retryable statuses surface as errors, never as an empty response.
    #[instrument(skip(self), fields(city = %self.location.city))]
    pub async fn fetch_forecast(&self) -> Result<ForecastResponse, FetchError> {
        let url = self.request_url()?;
        info!(
            "Fetching weather data for {} (lat={}, lon={})",
            self.location.city, self.location.latitude, self.location.longitude
        );

        let response = (|| async { self.fetch_once(&url).await })
            .retry(self.retry_policy.backoff())
            .when(FetchError::is_transient)
            .notify(|e: &FetchError, delay: Duration| {
                warn!("Transient forecast fetch failure, retrying in {:?}: {}", delay, e);
            })
            .await?;

        let days = response.daily.as_ref().map_or(0, DailySeries::day_count);
        info!("Received {} days of data", days);
        Ok(response)
    }

    async fn fetch_once(&self, url: &reqwest::Url) -> Result<ForecastResponse, FetchError> {
        debug!("Sending HTTP request to {}", url);
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        Ok(response.json::<ForecastResponse>().await?)
    }

    /// Build the GET URL with the query parameters the forecast API expects.
    pub fn request_url(&self) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", self.url)))?;

        url.query_pairs_mut()
            .append_pair("latitude", &self.location.latitude.to_string())
            .append_pair("longitude", &self.location.longitude.to_string())
            .append_pair("daily", &DAILY_SERIES.join(","))
            .append_pair("past_days", &PAST_DAYS.to_string())
            .append_pair("timezone", &self.location.timezone);

        Ok(url)
    }
}

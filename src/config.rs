use std::env;

use crate::fetcher::DEFAULT_FORECAST_URL;
use crate::scheduler::{MAX_DASHBOARD_POLL_SECONDS, MAX_PIPELINE_INTERVAL_MINUTES};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub forecast_url: String,
    pub pipeline_interval_minutes: u64,
    pub dashboard_poll_seconds: u64,
    pub run_pipeline_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            // WEATHER_DB_CONN is the deployment name; DATABASE_URL is what sqlx tooling expects
            database_url: env::var("WEATHER_DB_CONN").or_else(|_| env::var("DATABASE_URL"))?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            forecast_url: env::var("FORECAST_URL")
                .unwrap_or_else(|_| DEFAULT_FORECAST_URL.to_string()),
            pipeline_interval_minutes: env::var("PIPELINE_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "1440".to_string())
                .parse()
                .unwrap_or(1440)
                .clamp(1, MAX_PIPELINE_INTERVAL_MINUTES),
            dashboard_poll_seconds: env::var("DASHBOARD_POLL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300)
                .clamp(1, MAX_DASHBOARD_POLL_SECONDS),
            run_pipeline_on_startup: env::var("RUN_PIPELINE_ON_STARTUP")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

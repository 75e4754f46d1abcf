use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::pipeline::Pipeline;
use crate::services::DashboardService;

/// Longest accepted pipeline interval: one year.
pub const MAX_PIPELINE_INTERVAL_MINUTES: u64 = 366 * 24 * 60;
/// Longest accepted dashboard poll interval: one day.
pub const MAX_DASHBOARD_POLL_SECONDS: u64 = 24 * 60 * 60;

/// Pipeline tick period, clamped to `1..=MAX_PIPELINE_INTERVAL_MINUTES` minutes.
pub fn pipeline_period(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.clamp(1, MAX_PIPELINE_INTERVAL_MINUTES) * 60)
}

/// Dashboard poll period, clamped to `1..=MAX_DASHBOARD_POLL_SECONDS` seconds.
pub fn dashboard_poll_period(poll_seconds: u64) -> Duration {
    Duration::from_secs(poll_seconds.clamp(1, MAX_DASHBOARD_POLL_SECONDS))
}

/// Trigger the pipeline on a fixed interval. A failed run is logged and the
/// next tick simply runs the whole pipeline again.
#[instrument(skip(pipeline), fields(interval_minutes = %interval_minutes))]
pub async fn start_pipeline_scheduler(
    pipeline: Pipeline,
    interval_minutes: u64,
    run_immediately: bool,
) {
    let period = pipeline_period(interval_minutes);
    let now = Instant::now();
    let first_tick = if run_immediately {
        now
    } else {
        now.checked_add(period).unwrap_or(now)
    };
    let mut interval = time::interval_at(first_tick, period);

    info!(
        "Pipeline scheduler started with {} minute interval",
        period.as_secs() / 60
    );

    loop {
        interval.tick().await;
        debug!("Scheduler tick - starting pipeline run");

        match pipeline.run().await {
            Ok(report) => {
                if report.inserted > 0 {
                    info!("Pipeline run stored {} new observations", report.inserted);
                } else {
                    debug!("Pipeline run stored no new observations (all duplicates)");
                }
            }
            Err(e) => {
                error!("Pipeline run failed at task {}: {}", e.step(), e);
            }
        }
    }
}

/// Refresh the dashboard read model on a fixed interval, starting immediately.
#[instrument(skip(dashboard), fields(poll_seconds = %poll_seconds))]
pub async fn start_dashboard_poller(dashboard: DashboardService, poll_seconds: u64) {
    let period = dashboard_poll_period(poll_seconds);
    let mut interval = time::interval(period);

    info!(
        "Dashboard poller started with {} second interval",
        period.as_secs()
    );

    loop {
        interval.tick().await;
        if !dashboard.refresh().await {
            warn!("Dashboard is serving stale data until the next successful poll");
        }
    }
}

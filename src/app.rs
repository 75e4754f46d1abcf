use sqlx::PgPool;
use tokio::task::{JoinError, JoinHandle};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{ObservationRepository, SummaryRepository};
use crate::fetcher::{ForecastFetcher, Location};
use crate::pipeline::Pipeline;
use crate::scheduler;
use crate::services::DashboardService;

#[derive(Debug, thiserror::Error)]
pub enum BackgroundTaskError {
    #[error("{task} failed: {source}")]
    Failed {
        task: &'static str,
        source: JoinError,
    },
    #[error("{task} exited unexpectedly")]
    Exited { task: &'static str },
}

impl BackgroundTaskError {
    fn from_join(task: &'static str, result: Result<(), JoinError>) -> Self {
        let err = match result {
            Ok(()) => BackgroundTaskError::Exited { task },
            Err(source) => BackgroundTaskError::Failed { task, source },
        };
        error!("Background task stopped: {}", err);
        err
    }
}

/// Application with all spawned background tasks and server
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub pipeline_scheduler_handle: JoinHandle<()>,
    pub dashboard_poller_handle: JoinHandle<()>,
}

impl Application {
    /// Build and initialize the application
    ///
    /// Spawns:
    /// - HTTP dashboard API (Axum)
    /// - Pipeline scheduler (daily by default)
    /// - Dashboard poller (5 min by default)
    pub async fn build(config: Config, pool: PgPool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let observation_repo = ObservationRepository::new(pool.clone());
        let summary_repo = SummaryRepository::new(pool.clone());

        let fetcher = ForecastFetcher::new(config.forecast_url.clone(), Location::singapore())?;
        let pipeline = Pipeline::new(fetcher, pool.clone());
        let dashboard_service = DashboardService::new(observation_repo, summary_repo);

        let pipeline_scheduler_handle = {
            let interval = config.pipeline_interval_minutes;
            let run_immediately = config.run_pipeline_on_startup;
            tokio::spawn(async move {
                scheduler::start_pipeline_scheduler(pipeline, interval, run_immediately).await;
            })
        };

        let dashboard_poller_handle = {
            let dashboard_clone = dashboard_service.clone();
            let poll_seconds = config.dashboard_poll_seconds;
            tokio::spawn(async move {
                scheduler::start_dashboard_poller(dashboard_clone, poll_seconds).await;
            })
        };

        let app_state = AppState { dashboard_service };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            pipeline_scheduler_handle,
            dashboard_poller_handle,
        })
    }

    /// Run until the server stops or a background task dies.
    ///
    /// The scheduler and poller loop forever, so either of them finishing is an error.
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        tokio::select! {
            result = self.server_handle => {
                result??;
                Ok(())
            }
            result = self.pipeline_scheduler_handle => {
                Err(BackgroundTaskError::from_join("pipeline scheduler", result).into())
            }
            result = self.dashboard_poller_handle => {
                Err(BackgroundTaskError::from_join("dashboard poller", result).into())
            }
        }
    }
}

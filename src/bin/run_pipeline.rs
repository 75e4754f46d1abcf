use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use weather_etl_service::fetcher::{ForecastFetcher, Location, DEFAULT_FORECAST_URL};
use weather_etl_service::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "run-pipeline")]
#[command(about = "Run the weather ETL pipeline once and exit", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "WEATHER_DB_CONN")]
    database_url: String,

    /// Forecast API endpoint
    #[arg(long, env = "FORECAST_URL", default_value = DEFAULT_FORECAST_URL)]
    forecast_url: String,

    /// Skip running migrations before the pipeline
    #[arg(long)]
    skip_migrations: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,weather_etl_service=debug")),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cli.database_url)
        .await?;

    if !cli.skip_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let fetcher = ForecastFetcher::new(cli.forecast_url, Location::singapore())?;
    let pipeline = Pipeline::new(fetcher, pool);

    match pipeline.run().await {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                info!(
                    "Run finished: {} days fetched, {} inserted, {} skipped, raw_weather={} rows, daily_summary={} rows",
                    report.days_fetched,
                    report.inserted,
                    report.skipped,
                    report.total_raw_rows,
                    report.summary_rows
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed at task {}: {}", e.step(), e);
            Err(e.into())
        }
    }
}

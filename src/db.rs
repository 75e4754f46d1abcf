pub mod error;
pub mod models;
pub mod observation_repository;
pub mod summary_repository;
pub mod table_stats;

pub use error::DbError;
pub use models::*;
pub use observation_repository::{ObservationRepository, RAW_WEATHER_TABLE};
pub use summary_repository::{SummaryRepository, DAILY_SUMMARY_TABLE};
pub use table_stats::TableStatsRepository;

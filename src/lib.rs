pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod fetch_error;
pub mod fetcher;
pub mod normalizer;
pub mod pipeline;
pub mod scheduler;
pub mod services;

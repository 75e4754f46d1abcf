pub mod dashboard_service;
pub mod load_service;
pub mod quality_gate;

pub use dashboard_service::DashboardService;
pub use load_service::LoadService;
pub use quality_gate::QualityGate;

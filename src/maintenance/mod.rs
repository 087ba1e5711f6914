// ==========================================
// 疫情通报采集系统 - 维护层
// ==========================================

pub mod error;
pub mod maintenance_service;

pub use error::{MaintenanceError, MaintenanceResult};
pub use maintenance_service::{load_lookup, LabelReport, MaintenanceService, RenameOutcome};

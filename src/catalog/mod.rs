// ==========================================
// 疫情通报采集系统 - 人口参考数据层
// ==========================================
// 职责: 区域规范名与人口的只读目录
// ==========================================

pub mod builder;
pub mod error;
pub mod region_catalog;

pub use builder::{build_population_file, build_population_json};
pub use error::{CatalogError, CatalogResult};
pub use region_catalog::RegionCatalog;

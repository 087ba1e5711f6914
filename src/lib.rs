// ==========================================
// 疫情通报采集系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 16 个联邦州疫情通报的抽取、归一化与入库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 人口参考数据
pub mod catalog;

// 导入层 - 抽取 / 规范化 / 计算 / 汇总
pub mod importer;

// 数据仓储层 - 数据访问
pub mod repository;

// 维护层 - 历史数据重命名与重算
pub mod maintenance;

// 通知层
pub mod notify;

// 文档获取
pub mod fetch;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FederalState, Measurement, ObservationKind, PerPopulation, RegionKind};

// 领域实体
pub use domain::{
    Anomaly, AnomalyKind, CanonicalRecord, Extraction, IngestOutcome, IngestRun, PublishedTotal,
    RawObservation, RecordFields, RecordTags, Region, RunStatus,
};

// 导入
pub use importer::{
    BulletinImporter, BulletinImporterImpl, FailureKind, ImportError, ImportOptions, ImportResult,
    NameCanonicalizer, SourceConfig, SourceDocument,
};

// 存储与维护
pub use catalog::RegionCatalog;
pub use maintenance::MaintenanceService;
pub use repository::{RecordStore, SqliteRecordStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "corona-ingest";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

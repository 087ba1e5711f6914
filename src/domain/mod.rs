// ==========================================
// 疫情通报采集系统 - 领域模型层
// ==========================================
// 职责: 定义区域、记录、运行审计等实体
// 红线: 不含数据访问逻辑,不含解析逻辑
// ==========================================

pub mod record;
pub mod region;
pub mod types;

// 重导出核心类型
pub use record::{
    format_timestamp, parse_timestamp, Anomaly, AnomalyKind, CanonicalRecord,
    Extraction, IngestOutcome, IngestRun, PublishedTotal, RawObservation, RecordFields,
    RecordTags, RunStatus, TIME_FORMAT,
};
pub use region::{split_city_suffix, Region, CITY_SUFFIX};
pub use types::{FederalState, Measurement, ObservationKind, PerPopulation, RegionKind};

// ==========================================
// 疫情通报采集系统 - 导入层
// ==========================================
// 职责: 通报文档 → 规范记录
// 支持: HTML 表格, Excel 工作簿, CSV, 正文
// ==========================================

// 模块声明
pub mod aggregator;
pub mod bulletin_importer_impl;
pub mod bulletin_importer_trait;
pub mod error;
pub mod extractor;
pub mod metric_calculator;
pub mod name_canonicalizer;
pub mod source_config;
pub mod sources;

// 重导出核心类型
pub use aggregator::{Aggregator, StateTotal, TotalMismatch};
pub use bulletin_importer_impl::BulletinImporterImpl;
pub use error::{FailureKind, ImportError, ImportResult};
pub use extractor::{extractor_for, ExtractContext, RecordExtractor, SourceDocument};
pub use metric_calculator::{compute_rate, MetricCalculator, RateOutcome, RateTarget, UnresolvedReason};
pub use name_canonicalizer::{CanonicalName, NameCanonicalizer, RewriteRule, RuleAction, RuleCondition};
pub use source_config::SourceConfig;
pub use sources::{all_sources, canonicalizer_for, source_for};

// 重导出 Trait 接口
pub use bulletin_importer_trait::{BulletinImporter, ImportOptions};

// ==========================================
// 疫情通报采集系统 - 数据仓储层
// ==========================================
// 职责: 提供时间序列存储接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod error;
pub mod record_store;
pub mod record_store_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use record_store::RecordStore;
pub use record_store_impl::SqliteRecordStore;

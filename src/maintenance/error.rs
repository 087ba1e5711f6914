// ==========================================
// 疫情通报采集系统 - 维护操作错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("存储操作失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("重命名对照表读取失败 ({path}): {message}")]
    LookupFile { path: String, message: String },
}

/// Result 类型别名
pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

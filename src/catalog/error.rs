// ==========================================
// 疫情通报采集系统 - 人口参考数据错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::{FederalState, RegionKind};
use thiserror::Error;

/// 人口参考数据错误类型
#[derive(Error, Debug)]
pub enum CatalogError {
    // ===== 启动期错误（致命） =====
    #[error("人口参考数据格式错误: {0}")]
    Malformed(String),

    #[error("人口参考数据 JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("人口参考数据读取失败 ({path}): {message}")]
    Io { path: String, message: String },

    #[error("人口 CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    // ===== 查询错误 =====
    #[error("参考数据中未找到区域: kind={kind}, state={state}, name={name}")]
    NotFound {
        kind: RegionKind,
        state: FederalState,
        name: String,
    },
}

/// Result 类型别名
pub type CatalogResult<T> = Result<T, CatalogError>;

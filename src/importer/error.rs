// ==========================================
// 疫情通报采集系统 - 导入模块错误类型
// ==========================================
// 分类: 启动 / 抓取 / 结构解析 / 存储
// 工具: thiserror 派生宏
// ==========================================

use crate::catalog::CatalogError;
use crate::domain::types::FederalState;
use crate::repository::error::RepositoryError;
use std::fmt;
use thiserror::Error;

/// 失败类别
///
/// 调用方据此决定是否自动重跑整个运行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Startup,    // 参考数据 / 配置错误
    Fetch,      // 文档抓取失败
    Structural, // 文档结构与预期不符
    Store,      // 批量写入失败
}

impl FailureKind {
    /// 抓取与存储失败可整体重跑；结构与启动错误需人工处理
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Fetch | FailureKind::Store)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Startup => write!(f, "STARTUP"),
            FailureKind::Fetch => write!(f, "FETCH"),
            FailureKind::Structural => write!(f, "STRUCTURAL"),
            FailureKind::Store => write!(f, "STORE"),
        }
    }
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 抓取错误 =====
    #[error("文档抓取失败 ({url}): {message}")]
    Fetch { url: String, message: String },

    #[error("文档抓取失败 ({url}): HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    // ===== 结构解析错误 =====
    #[error("[{state}] 未找到锚点: {anchor}")]
    AnchorNotFound { state: FederalState, anchor: String },

    #[error("[{state}] 通报时间解析失败: '{text}'")]
    TimestampNotFound { state: FederalState, text: String },

    #[error("[{state}] 列数不符 (行 {row}): 期望 {expected}，实际 {actual}")]
    ColumnCount {
        state: FederalState,
        row: usize,
        expected: String,
        actual: usize,
    },

    #[error("[{state}] 数值解析失败 (行 {row}, 字段 {field}): '{value}'")]
    InvalidNumber {
        state: FederalState,
        row: usize,
        field: String,
        value: String,
    },

    #[error("[{state}] 附件日期 {attachment} 与页面日期 {page} 不一致，数据尚未发布")]
    DateMismatch {
        state: FederalState,
        page: String,
        attachment: String,
    },

    #[error("[{0}] 缺少附件文档")]
    MissingAttachment(FederalState),

    #[error("[{0}] 未抽取到任何数据")]
    EmptyExtraction(FederalState),

    #[error("[{state}] 有来源合计 {published} 但未读到任何县/市行")]
    TotalWithoutRegions { state: FederalState, published: u64 },

    #[error("[{state}] 规范名重复: '{name}' (行 {first_row} 与行 {row})")]
    DuplicateRegion {
        state: FederalState,
        name: String,
        first_row: usize,
        row: usize,
    },

    #[error("[{state}] 州合计不一致: 来源 {published}，逐行求和 {computed}")]
    TotalMismatch {
        state: FederalState,
        published: u64,
        computed: u64,
    },

    #[error("HTML 选择器无效: {0}")]
    SelectorError(String),

    #[error("正则表达式无效: {0}")]
    RegexError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 存储错误 =====
    #[error("批量写入失败: {0}")]
    Store(#[from] RepositoryError),

    // ===== 启动错误 =====
    #[error("人口参考数据错误: {0}")]
    Catalog(#[from] CatalogError),

    #[error("配置错误 (key: {key}): {message}")]
    ConfigError { key: String, message: String },

    #[error("未配置数据源: {0}")]
    UnknownSource(String),
}

impl ImportError {
    /// 错误所属类别
    pub fn kind(&self) -> FailureKind {
        match self {
            ImportError::Fetch { .. }
            | ImportError::FetchStatus { .. }
            | ImportError::FileReadError(_) => FailureKind::Fetch,
            ImportError::Store(_) => FailureKind::Store,
            ImportError::Catalog(_)
            | ImportError::ConfigError { .. }
            | ImportError::UnknownSource(_) => FailureKind::Startup,
            _ => FailureKind::Structural,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<regex::Error>
impl From<regex::Error> for ImportError {
    fn from(err: regex::Error) -> Self {
        ImportError::RegexError(err.to_string())
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match err.status() {
            Some(status) => ImportError::FetchStatus {
                url,
                status: status.as_u16(),
            },
            None => ImportError::Fetch {
                url,
                message: err.to_string(),
            },
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

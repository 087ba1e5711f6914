// ==========================================
// 疫情通报采集系统 - 运行配置
// ==========================================
// 来源优先级（高 → 低）:
// 1. 环境变量 CORONA_INGEST_DB_PATH（仅数据库路径）
// 2. 显式指定的配置文件 / 环境变量 CORONA_INGEST_CONFIG
// 3. 内置默认值
// ==========================================

use crate::catalog::{CatalogResult, RegionCatalog};
use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "CORONA_INGEST_CONFIG";

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CORONA_INGEST_DB_PATH";

const DEFAULT_USER_AGENT: &str = "corona-ingest/0.1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ==========================================
// PushoverConfig - 失败通知渠道
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushoverConfig {
    pub token: String,
    pub user: String,
}

// ==========================================
// AppConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: Option<String>,      // None 时使用用户数据目录
    pub catalog_path: Option<String>, // None 时使用内置人口数据
    pub user_agent: String,
    pub timeout_secs: u64,
    pub strict_totals: bool, // 州合计不一致时中止运行
    pub pushover: Option<PushoverConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            catalog_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_totals: false,
            pushover: None,
        }
    }
}

impl AppConfig {
    /// 从 JSON 配置文件读取（缺失字段取默认值）
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 按优先级加载配置
    ///
    /// # 参数
    /// - explicit: 命令行指定的配置文件
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                info!(path = %path.display(), "加载配置文件");
                Self::from_path(&path)?
            }
            None => {
                debug!("未指定配置文件，使用默认配置");
                Self::default()
            }
        };

        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                config.db_path = Some(trimmed.to_string());
            }
        }

        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".to_string(),
                message: "必须大于 0".to_string(),
            });
        }
        if let Some(pushover) = &self.pushover {
            if pushover.token.trim().is_empty() || pushover.user.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "pushover".to_string(),
                    message: "token 与 user 均不能为空".to_string(),
                });
            }
        }
        Ok(())
    }

    /// 最终使用的数据库路径
    pub fn resolved_db_path(&self) -> String {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }

    /// 加载人口参考数据
    pub fn load_catalog(&self) -> CatalogResult<RegionCatalog> {
        match &self.catalog_path {
            Some(path) => RegionCatalog::from_path(Path::new(path)),
            None => RegionCatalog::bundled(),
        }
    }
}

/// 默认数据库路径（用户数据目录）
pub fn default_db_path() -> String {
    let mut path = PathBuf::from("./corona_ingest.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("corona-ingest");
        // 确保目录存在
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("corona_ingest.db");
    }

    path.to_string_lossy().to_string()
}

// ==========================================
// 疫情通报采集系统 - 配置层
// ==========================================
// 职责: 运行配置加载（配置文件 + 环境变量覆写）
// ==========================================

pub mod app_config;
pub mod error;

pub use app_config::{default_db_path, AppConfig, PushoverConfig, CONFIG_PATH_ENV, DB_PATH_ENV};
pub use error::{ConfigError, ConfigResult};

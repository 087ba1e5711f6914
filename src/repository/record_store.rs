// ==========================================
// 疫情通报采集系统 - 时间序列存储 Trait
// ==========================================
// 职责: 定义记录批量写入 / 查询 / 重命名维护 / 运行审计接口
// 红线: 存储层不含业务规则，只做数据读写
// ==========================================

use crate::domain::record::{CanonicalRecord, IngestRun, RecordTags};
use crate::domain::types::Measurement;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// ==========================================
// RecordStore Trait
// ==========================================
// 实现者: SqliteRecordStore（使用 rusqlite）
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ===== 批量写入 =====

    /// 批量写入记录（幂等 upsert）
    ///
    /// # 参数
    /// - records: 一次运行的完整记录批次
    ///
    /// # 返回
    /// - Ok(usize): 写入条数
    /// - Err: 数据库错误（整个事务回滚，不存在部分成功）
    async fn write_batch(&self, records: &[CanonicalRecord]) -> RepositoryResult<usize>;

    // ===== 查询 =====

    /// 查询单个序列（按时间升序）
    ///
    /// # 参数
    /// - state: 联邦州德文全称
    /// - county: 县/市规范名；None 表示州级序列
    async fn query_series(
        &self,
        measurement: Measurement,
        state: &str,
        county: Option<&str>,
    ) -> RepositoryResult<Vec<CanonicalRecord>>;

    /// 查询某时间点之后（含）的全部记录
    async fn query_since(
        &self,
        measurement: Measurement,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<CanonicalRecord>>;

    /// 已存储的全部标签组合（去重）
    async fn list_tag_values(&self, measurement: Measurement) -> RepositoryResult<Vec<RecordTags>>;

    /// 记录总数
    async fn count_records(&self) -> RepositoryResult<usize>;

    // ===== 维护 =====

    /// 重命名区域的历史键
    ///
    /// 单事务: 读出全部匹配 → 以新键 upsert → 删除旧键
    ///
    /// # 参数
    /// - state: 限定联邦州；None 时旧名跨多个州则报错
    ///
    /// # 返回
    /// - Ok(usize): 迁移的记录条数
    async fn rename_region(
        &self,
        measurement: Measurement,
        state: Option<&str>,
        old_name: &str,
        new_name: &str,
    ) -> RepositoryResult<usize>;

    // ===== 运行审计 =====

    async fn insert_run(&self, run: &IngestRun) -> RepositoryResult<()>;

    /// 最近的运行记录（按开始时间倒序）
    async fn recent_runs(&self, limit: usize) -> RepositoryResult<Vec<IngestRun>>;
}

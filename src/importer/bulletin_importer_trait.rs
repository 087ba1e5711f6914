// ==========================================
// 疫情通报采集系统 - 通报导入 Trait
// ==========================================
// 职责: 定义单州单次运行的导入接口（不包含实现）
// ==========================================

use crate::domain::record::IngestOutcome;
use crate::importer::error::ImportResult;
use crate::importer::extractor::SourceDocument;
use crate::importer::source_config::SourceConfig;
use async_trait::async_trait;

/// 运行选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportOptions {
    pub dry_run: bool,               // 只解析与计算，不写记录
    pub strict_totals: bool,         // 州合计不一致时中止
    pub reference_year: Option<i32>, // 时间戳无年份时的参考年（默认当年）
}

// ==========================================
// BulletinImporter Trait
// ==========================================
// 实现者: BulletinImporterImpl
#[async_trait]
pub trait BulletinImporter: Send + Sync {
    /// 导入一份已获取的通报
    ///
    /// # 参数
    /// - source: 联邦州来源配置
    /// - document: 页面与附件
    /// - options: 运行选项
    ///
    /// # 返回
    /// - Ok(IngestOutcome): 写入的记录 + 软异常 + 运行审计
    /// - Err: 结构 / 存储错误（整个批次不写入，已发送通知）
    ///
    /// # 导入流程
    /// 1. 抽取（时间戳 + 观测行 + 来源合计）
    /// 2. 名称规范化
    /// 3. 发病率计算
    /// 4. 州级汇总与交叉校验
    /// 5. 批量写入（单事务）
    /// 6. 运行审计落库 + 异常通知
    async fn import(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        options: ImportOptions,
    ) -> ImportResult<IngestOutcome>;
}

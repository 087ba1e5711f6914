// ==========================================
// 疫情通报采集系统 - 通报导入器实现
// ==========================================
// 职责: 整合导入流程，从文档到存储
// 流程: 抽取 → 规范化 → 发病率 → 汇总 → 落库 → 审计 → 通知
// 红线: 结构错误时整批不写；软异常照常写入并通知
// ==========================================

use crate::catalog::RegionCatalog;
use crate::domain::record::{
    format_timestamp, Anomaly, AnomalyKind, CanonicalRecord, Extraction, IngestOutcome, IngestRun,
    RecordFields, RunStatus,
};
use crate::domain::types::FederalState;
use crate::importer::aggregator::{Aggregator, StateTotal};
use crate::importer::bulletin_importer_trait::{BulletinImporter, ImportOptions};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::extractor::{extractor_for, ExtractContext, SourceDocument};
use crate::importer::metric_calculator::{MetricCalculator, RateOutcome, RateTarget};
use crate::importer::name_canonicalizer::NameCanonicalizer;
use crate::importer::source_config::SourceConfig;
use crate::notify::{notify_quietly, Notifier};
use crate::repository::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 一次运行构建出的批次（尚未写入）
#[derive(Debug)]
struct PreparedBatch {
    timestamp: DateTime<Utc>,
    records: Vec<CanonicalRecord>,
    anomalies: Vec<Anomaly>,
    unresolved: usize,
    total: StateTotal,
}

// ==========================================
// BulletinImporterImpl
// ==========================================
pub struct BulletinImporterImpl<R>
where
    R: RecordStore,
{
    // 数据访问层
    store: R,

    // 人口参考数据（进程内只读）
    catalog: Arc<RegionCatalog>,

    // 运维通知
    notifier: Arc<dyn Notifier>,
}

impl<R> BulletinImporterImpl<R>
where
    R: RecordStore,
{
    pub fn new(store: R, catalog: Arc<RegionCatalog>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            catalog,
            notifier,
        }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// 步骤 1-4: 抽取并构建完整批次（纯计算，不触碰存储）
    fn prepare(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        options: ImportOptions,
    ) -> ImportResult<PreparedBatch> {
        // === 步骤 1: 抽取 ===
        debug!("步骤 1: 抽取");
        let ctx = match options.reference_year {
            Some(year) => ExtractContext::with_year(year),
            None => ExtractContext::default(),
        };
        let extraction: Extraction = extractor_for(&source.strategy).extract(source, document, &ctx)?;
        info!(
            timestamp = %format_timestamp(&extraction.timestamp),
            observations = extraction.observations.len(),
            has_published_total = extraction.published_total.is_some(),
            "抽取完成"
        );

        // === 步骤 2-3: 规范化 + 发病率 ===
        debug!("步骤 2: 名称规范化 / 步骤 3: 发病率计算");
        let canonicalizer = NameCanonicalizer::new(source.rules.clone());
        let calculator = MetricCalculator::new(&self.catalog, source.state, &source.resolution);
        let mut aggregator = Aggregator::new(source.state);
        let mut records = Vec::with_capacity(extraction.observations.len() + 1);
        let mut anomalies = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut unresolved = 0usize;

        for observation in &extraction.observations {
            let canonical =
                canonicalizer.canonicalize(&observation.region_label, observation.region_kind);
            if canonical.name.is_empty() {
                warn!(row = observation.row_number, label = %observation.region_label, "规范名为空，跳过该行");
                continue;
            }
            // 重名记录在 upsert 时互相覆盖
            if let Some(first_row) = seen.insert(canonical.name.clone(), observation.row_number) {
                return Err(ImportError::DuplicateRegion {
                    state: source.state,
                    name: canonical.name,
                    first_row,
                    row: observation.row_number,
                });
            }

            let (p10k, p100k) = calculator.rates(RateTarget::Region(&canonical), observation.infected);
            if let RateOutcome::Unresolved(reason) = &p10k {
                unresolved += 1;
                warn!(county = %canonical.name, reason = %reason, "人口无法解析，发病率留空");
                anomalies.push(Anomaly::new(
                    AnomalyKind::UnresolvedPopulation,
                    Some(canonical.name.clone()),
                    format!("{}: {}", source.state, reason),
                ));
            }

            aggregator.add(observation.infected, observation.deaths);
            records.push(CanonicalRecord::region(
                source.state,
                canonical.name,
                extraction.timestamp,
                RecordFields {
                    count: observation.infected as i64,
                    p10k: p10k.value(),
                    p100k: p100k.value(),
                    death: observation.deaths.map(|d| d as i64),
                },
            ));
        }

        // === 步骤 4: 州级汇总 ===
        debug!("步骤 4: 州级汇总");
        let total = aggregator.finish(extraction.published_total);
        if let Some(mismatch) = total.mismatch {
            warn!(
                published = mismatch.published,
                computed = mismatch.computed,
                "州合计与逐行求和不一致，以来源合计为准"
            );
            anomalies.push(Anomaly::new(
                AnomalyKind::TotalMismatch,
                None,
                format!(
                    "{}: Summe {} != berechnet {}",
                    source.state, mismatch.published, mismatch.computed
                ),
            ));
        }

        let (p10k, p100k) = calculator.rates(RateTarget::State, total.count);
        if let RateOutcome::Unresolved(reason) = &p10k {
            unresolved += 1;
            warn!(reason = %reason, "州人口无法解析，州级发病率留空");
            anomalies.push(Anomaly::new(
                AnomalyKind::UnresolvedPopulation,
                None,
                format!("{}: {}", source.state, reason),
            ));
        }
        records.push(CanonicalRecord::state_total(
            source.state,
            extraction.timestamp,
            RecordFields {
                count: total.count as i64,
                p10k: p10k.value(),
                p100k: p100k.value(),
                death: total.death.map(|d| d as i64),
            },
        ));

        Ok(PreparedBatch {
            timestamp: extraction.timestamp,
            records,
            anomalies,
            unresolved,
            total,
        })
    }

    /// 步骤 1-5
    async fn prepare_and_write(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        options: ImportOptions,
    ) -> ImportResult<PreparedBatch> {
        let batch = self.prepare(source, document, options)?;

        if options.strict_totals {
            if let Some(mismatch) = batch.total.mismatch {
                return Err(ImportError::TotalMismatch {
                    state: source.state,
                    published: mismatch.published,
                    computed: mismatch.computed,
                });
            }
        }

        // === 步骤 5: 批量写入 ===
        if options.dry_run {
            info!(records = batch.records.len(), "试运行，跳过写入");
        } else {
            debug!("步骤 5: 批量写入");
            let written = self.store.write_batch(&batch.records).await?;
            info!(written, "批量写入完成");
        }

        Ok(batch)
    }

    /// 记录失败运行并通知
    ///
    /// 获取文档阶段的失败同样经此上报
    pub async fn report_failure(&self, state: FederalState, error: &ImportError) {
        let run_id = Uuid::new_v4().to_string();
        self.record_failure(state, &run_id, Utc::now(), Instant::now(), error)
            .await;
    }

    async fn record_failure(
        &self,
        state: FederalState,
        run_id: &str,
        started_at: DateTime<Utc>,
        start_time: Instant,
        error: &ImportError,
    ) {
        let message = error.to_string().replace('\n', " ");
        error!(state = %state, kind = %error.kind(), error = %message, "导入失败");

        let run = IngestRun {
            run_id: run_id.to_string(),
            state,
            bulletin_timestamp: None,
            record_count: 0,
            unresolved_count: 0,
            total_mismatch: matches!(error, ImportError::TotalMismatch { .. }),
            status: RunStatus::Failed,
            message: Some(message.clone()),
            started_at,
            elapsed_ms: start_time.elapsed().as_millis() as i64,
        };
        self.record_run(&run).await;
        notify_quietly(self.notifier.as_ref(), state, &message).await;
    }

    async fn record_run(&self, run: &IngestRun) {
        if let Err(e) = self.store.insert_run(run).await {
            warn!(run_id = %run.run_id, error = %e, "运行审计写入失败");
        }
    }
}

#[async_trait]
impl<R> BulletinImporter for BulletinImporterImpl<R>
where
    R: RecordStore,
{
    #[instrument(skip(self, source, document), fields(state = %source.state, run_id))]
    async fn import(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        options: ImportOptions,
    ) -> ImportResult<IngestOutcome> {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!(dry_run = options.dry_run, "开始导入通报");

        match self.prepare_and_write(source, document, options).await {
            Ok(batch) => {
                // === 步骤 6: 审计 + 通知 ===
                let run = IngestRun {
                    run_id,
                    state: source.state,
                    bulletin_timestamp: Some(batch.timestamp),
                    record_count: batch.records.len(),
                    unresolved_count: batch.unresolved,
                    total_mismatch: batch.total.mismatch.is_some(),
                    status: if options.dry_run {
                        RunStatus::DryRun
                    } else {
                        RunStatus::Success
                    },
                    message: None,
                    started_at,
                    elapsed_ms: start_time.elapsed().as_millis() as i64,
                };
                self.record_run(&run).await;

                for anomaly in &batch.anomalies {
                    notify_quietly(self.notifier.as_ref(), source.state, &anomaly.message).await;
                }

                info!(
                    records = run.record_count,
                    unresolved = run.unresolved_count,
                    anomalies = batch.anomalies.len(),
                    elapsed_ms = run.elapsed_ms,
                    "导入完成"
                );

                Ok(IngestOutcome {
                    run,
                    records: batch.records,
                    anomalies: batch.anomalies,
                })
            }
            Err(e) => {
                self.record_failure(source.state, &run_id, started_at, start_time, &e)
                    .await;
                Err(e)
            }
        }
    }
}

// ==========================================
// 疫情通报采集系统 - 历史数据维护
// ==========================================
// 操作: 单个重命名 / 按现行规则批量重命名 / 按对照表重命名 / 重算州级发病率
// 红线: 仅在显式调用时执行；单个区域的重命名在一个事务内完成
// ==========================================

use crate::catalog::RegionCatalog;
use crate::domain::record::{CanonicalRecord, RecordTags};
use crate::domain::region::split_city_suffix;
use crate::domain::types::{FederalState, Measurement, ObservationKind, PerPopulation};
use crate::importer::metric_calculator::{compute_rate, MetricCalculator, RateTarget};
use crate::importer::name_canonicalizer::CanonicalName;
use crate::importer::sources::{canonicalizer_for, source_for};
use crate::maintenance::error::{MaintenanceError, MaintenanceResult};
use crate::repository::RecordStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 单个标签的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { records: usize },
    Unchanged,           // 规则未改变名称
    AlreadyCanonical,    // 已能在参考数据中解析
    SurroundingSpace,    // 标签含首尾空白，需人工处理
    UnknownState,        // state 标签不是联邦州全称
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelReport {
    pub state: String,
    pub old_name: String,
    pub new_name: String,
    pub outcome: RenameOutcome,
}

// ==========================================
// MaintenanceService
// ==========================================
pub struct MaintenanceService<R>
where
    R: RecordStore,
{
    store: R,
    catalog: Arc<RegionCatalog>,
}

impl<R> MaintenanceService<R>
where
    R: RecordStore,
{
    pub fn new(store: R, catalog: Arc<RegionCatalog>) -> Self {
        Self { store, catalog }
    }

    /// 重命名单个区域（与新名已有记录合并）
    ///
    /// # 参数
    /// - state: 限定联邦州；None 时旧名跨多个州则报错
    ///
    /// # 返回
    /// - Ok(usize): 迁移的记录条数（旧名不存在时为 0）
    #[instrument(skip(self))]
    pub async fn rename_region(
        &self,
        state: Option<FederalState>,
        old_name: &str,
        new_name: &str,
    ) -> MaintenanceResult<usize> {
        let moved = self
            .store
            .rename_region(
                Measurement::InfectedDeState,
                state.map(|s| s.name()),
                old_name,
                new_name,
            )
            .await?;
        if moved == 0 {
            warn!("未找到旧名记录");
        }
        Ok(moved)
    }

    /// 按现行规范化规则重命名全部已存储的县/市标签
    ///
    /// # 返回
    /// - 每个标签一条报告（含跳过与失败）
    #[instrument(skip(self))]
    pub async fn rename_with_rules(&self) -> MaintenanceResult<Vec<LabelReport>> {
        let tags = self.store.list_tag_values(Measurement::InfectedDeState).await?;
        let mut reports = Vec::with_capacity(tags.len());

        for RecordTags { state, county } in tags {
            let Some(old_name) = county else { continue };
            let mut report = LabelReport {
                state: state.clone(),
                old_name: old_name.clone(),
                new_name: old_name.clone(),
                outcome: RenameOutcome::Unchanged,
            };

            let Some(federal_state) = FederalState::from_name(&state) else {
                report.outcome = RenameOutcome::UnknownState;
                reports.push(report);
                continue;
            };
            if old_name != old_name.trim() {
                report.outcome = RenameOutcome::SurroundingSpace;
                reports.push(report);
                continue;
            }
            if self.resolves(federal_state, &old_name) {
                report.outcome = RenameOutcome::AlreadyCanonical;
                reports.push(report);
                continue;
            }

            let new_name = canonicalizer_for(federal_state).canonicalize_label(&old_name);
            report.new_name = new_name.clone();
            if new_name == old_name {
                reports.push(report);
                continue;
            }

            report.outcome = self
                .rename_one(federal_state, &old_name, &new_name)
                .await;
            reports.push(report);
        }

        log_summary(&reports);
        Ok(reports)
    }

    /// 按对照表重命名
    ///
    /// # 参数
    /// - lookup: 旧名 → 新名
    /// - state: 限定联邦州；None 时按各旧名实际所在的州
    #[instrument(skip(self, lookup), fields(entries = lookup.len()))]
    pub async fn rename_from_lookup(
        &self,
        lookup: &BTreeMap<String, String>,
        state: Option<FederalState>,
    ) -> MaintenanceResult<Vec<LabelReport>> {
        let mut reports = Vec::with_capacity(lookup.len());

        for (old_name, new_name) in lookup {
            let outcome = if old_name == new_name {
                RenameOutcome::Unchanged
            } else {
                match self.rename_region(state, old_name, new_name).await {
                    Ok(records) => RenameOutcome::Renamed { records },
                    Err(e) => RenameOutcome::Failed(e.to_string()),
                }
            };
            reports.push(LabelReport {
                state: state.map(|s| s.name().to_string()).unwrap_or_default(),
                old_name: old_name.clone(),
                new_name: new_name.clone(),
                outcome,
            });
        }

        log_summary(&reports);
        Ok(reports)
    }

    /// 按参考数据重算州级记录的 p10k / p100k
    ///
    /// # 参数
    /// - since: 起始时间（含）
    ///
    /// # 返回
    /// - Ok(usize): 重写的记录条数
    #[instrument(skip(self))]
    pub async fn recalculate_rates(&self, since: DateTime<Utc>) -> MaintenanceResult<usize> {
        let records = self.store.query_since(Measurement::InfectedDe, since).await?;
        let mut updated: Vec<CanonicalRecord> = Vec::with_capacity(records.len());

        for mut record in records {
            let Some(state) = FederalState::from_name(&record.tags.state) else {
                warn!(state = %record.tags.state, "未知联邦州，跳过");
                continue;
            };
            let population = match self.catalog.state_population(state) {
                Ok(p) => p,
                Err(e) => {
                    warn!(state = %state, error = %e, "州人口缺失，跳过");
                    continue;
                }
            };
            let count = record.fields.count.max(0) as u64;
            record.fields.p10k = Some(compute_rate(count, population, PerPopulation::TenThousand));
            record.fields.p100k = Some(compute_rate(
                count,
                population,
                PerPopulation::HundredThousand,
            ));
            updated.push(record);
        }

        let written = self.store.write_batch(&updated).await?;
        info!(written, "州级发病率重算完成");
        Ok(written)
    }

    fn resolves(&self, state: FederalState, name: &str) -> bool {
        let source = source_for(state);
        let calculator = MetricCalculator::new(&self.catalog, state, &source.resolution);
        let kind = if split_city_suffix(name).1 {
            ObservationKind::City
        } else {
            ObservationKind::None
        };
        let canonical = CanonicalName {
            name: name.to_string(),
            kind,
        };
        calculator.population(RateTarget::Region(&canonical)).is_ok()
    }

    async fn rename_one(&self, state: FederalState, old_name: &str, new_name: &str) -> RenameOutcome {
        match self.rename_region(Some(state), old_name, new_name).await {
            Ok(records) => RenameOutcome::Renamed { records },
            Err(e) => {
                warn!(old = old_name, new = new_name, error = %e, "重命名失败");
                RenameOutcome::Failed(e.to_string())
            }
        }
    }
}

/// 读取重命名对照表（JSON 对象: 旧名 → 新名）
pub fn load_lookup(path: &Path) -> MaintenanceResult<BTreeMap<String, String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| MaintenanceError::LookupFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| MaintenanceError::LookupFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn log_summary(reports: &[LabelReport]) {
    let renamed = reports
        .iter()
        .filter(|r| matches!(r.outcome, RenameOutcome::Renamed { .. }))
        .count();
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, RenameOutcome::Failed(_)))
        .count();
    info!(labels = reports.len(), renamed, failed, "批量重命名完成");
}

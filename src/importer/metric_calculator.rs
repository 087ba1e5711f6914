// ==========================================
// 疫情通报采集系统 - 发病率计算
// ==========================================
// rate = round(count * factor / population, 2)
// 舍入: 四舍五入（远离零），对 ×100 后的值调用 f64::round
// 红线: 人口查不到时返回 Unresolved，不中断其余记录
// ==========================================

use crate::catalog::RegionCatalog;
use crate::domain::region::split_city_suffix;
use crate::domain::types::{FederalState, ObservationKind, PerPopulation, RegionKind};
use crate::importer::name_canonicalizer::CanonicalName;
use crate::importer::source_config::{LookupOrder, RegionResolution};
use std::fmt;

/// 人口无法解析的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// 参考数据中无此区域（记录尝试过的层级）
    NotInCatalog {
        name: String,
        tried: Vec<RegionKind>,
    },
    /// 合并区域的某个组成部分缺失
    MissingPart { composite: String, part: String },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NotInCatalog { name, tried } => {
                let kinds: Vec<&str> = tried.iter().map(|k| k.as_str()).collect();
                write!(f, "参考数据中无 '{}' (已查: {})", name, kinds.join(", "))
            }
            UnresolvedReason::MissingPart { composite, part } => {
                write!(f, "合并区域 '{}' 缺少组成部分 '{}'", composite, part)
            }
        }
    }
}

/// 发病率计算结果
#[derive(Debug, Clone, PartialEq)]
pub enum RateOutcome {
    Resolved(f64),
    Unresolved(UnresolvedReason),
}

impl RateOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            RateOutcome::Resolved(v) => Some(*v),
            RateOutcome::Unresolved(_) => None,
        }
    }
}

/// 计算目标
#[derive(Debug, Clone, Copy)]
pub enum RateTarget<'a> {
    State,
    Region(&'a CanonicalName),
}

/// 纯计算: 保留两位小数
pub fn compute_rate(count: u64, population: u64, factor: PerPopulation) -> f64 {
    let raw = count as f64 * factor.factor() / population as f64;
    (raw * 100.0).round() / 100.0
}

// ==========================================
// MetricCalculator - 单州发病率计算器
// ==========================================
pub struct MetricCalculator<'a> {
    catalog: &'a RegionCatalog,
    state: FederalState,
    resolution: &'a RegionResolution,
}

impl<'a> MetricCalculator<'a> {
    pub fn new(
        catalog: &'a RegionCatalog,
        state: FederalState,
        resolution: &'a RegionResolution,
    ) -> Self {
        Self {
            catalog,
            state,
            resolution,
        }
    }

    /// 解析目标人口
    ///
    /// 查找顺序:
    /// 1. 合并区域 → 各组成部分之和
    /// 2. " (Stadt)" 后缀或层级为市 → 市表（裸名）
    /// 3. 层级为县 → 县表
    /// 4. 其余按来源的查找顺序依次尝试
    pub fn population(&self, target: RateTarget<'_>) -> Result<u64, UnresolvedReason> {
        let region = match target {
            RateTarget::State => {
                return self.catalog.state_population(self.state).map_err(|_| {
                    UnresolvedReason::NotInCatalog {
                        name: self.state.name().to_string(),
                        tried: vec![RegionKind::State],
                    }
                })
            }
            RateTarget::Region(region) => region,
        };

        if let Some(composite) = self
            .resolution
            .composites
            .iter()
            .find(|c| c.label == region.name)
        {
            return composite
                .parts
                .iter()
                .map(|(kind, part)| {
                    self.catalog
                        .lookup(*kind, self.state, part)
                        .map_err(|_| UnresolvedReason::MissingPart {
                            composite: composite.label.clone(),
                            part: format!("{} {}", kind, part),
                        })
                })
                .sum();
        }

        let (bare, has_suffix) = split_city_suffix(&region.name);
        let order: Vec<RegionKind> = if has_suffix || region.kind == ObservationKind::City {
            vec![RegionKind::City]
        } else if region.kind == ObservationKind::County {
            vec![RegionKind::County]
        } else {
            match self.resolution.lookup_order {
                LookupOrder::CountyFirst => vec![RegionKind::County, RegionKind::City],
                LookupOrder::CityFirst => vec![RegionKind::City, RegionKind::County],
            }
        };

        order
            .iter()
            .find_map(|kind| self.catalog.lookup(*kind, self.state, bare).ok())
            .ok_or(UnresolvedReason::NotInCatalog {
                name: region.name.clone(),
                tried: order,
            })
    }

    /// 单个发病率
    pub fn rate(&self, target: RateTarget<'_>, count: u64, factor: PerPopulation) -> RateOutcome {
        match self.population(target) {
            Ok(population) => RateOutcome::Resolved(compute_rate(count, population, factor)),
            Err(reason) => RateOutcome::Unresolved(reason),
        }
    }

    /// 每万人 / 每十万人发病率
    pub fn rates(&self, target: RateTarget<'_>, count: u64) -> (RateOutcome, RateOutcome) {
        (
            self.rate(target, count, PerPopulation::TenThousand),
            self.rate(target, count, PerPopulation::HundredThousand),
        )
    }
}

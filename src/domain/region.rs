// ==========================================
// 疫情通报采集系统 - 区域实体
// ==========================================
// 职责: 人口参考数据中的一条记录（州 / 县 / 市）
// 红线: 进程启动后只读
// ==========================================

use crate::domain::types::{FederalState, RegionKind};
use serde::{Deserialize, Serialize};

/// 城市后缀（规范名中用于区分同名县与市）
pub const CITY_SUFFIX: &str = " (Stadt)";

// ==========================================
// Region - 参考区域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub kind: RegionKind,     // 层级
    pub state: FederalState,  // 所属联邦州
    pub name: String,         // 规范名（市不带后缀）
    pub population: u64,      // 人口（> 0）
}

impl Region {
    pub fn new(kind: RegionKind, state: FederalState, name: impl Into<String>, population: u64) -> Self {
        Self {
            kind,
            state,
            name: name.into(),
            population,
        }
    }
}

/// 拆分规范名中的城市后缀
///
/// # 返回
/// - (裸名, 是否带城市后缀)
pub fn split_city_suffix(canonical: &str) -> (&str, bool) {
    match canonical.strip_suffix(CITY_SUFFIX) {
        Some(bare) => (bare, true),
        None => (canonical, false),
    }
}

// ==========================================
// 疫情通报采集系统 - 人口参考数据
// ==========================================
// 结构: kind → 州简称 → 区域名 → 人口
//       （state 层级直接为 州简称 → 人口）
// 红线: 启动时加载一次，之后只读；格式错误直接终止启动
// ==========================================

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::domain::region::Region;
use crate::domain::types::{FederalState, RegionKind};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// 随程序发布的默认人口参考数据
const BUNDLED_POPULATION_JSON: &str = include_str!("../../data/population.json");

// ==========================================
// RegionCatalog - 区域人口目录
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    states: HashMap<FederalState, u64>,
    regions: HashMap<(RegionKind, FederalState), HashMap<String, u64>>,
}

impl RegionCatalog {
    /// 加载随程序发布的默认数据
    pub fn bundled() -> CatalogResult<Self> {
        Self::from_json_str(BUNDLED_POPULATION_JSON)
    }

    /// 从文件加载
    ///
    /// # 参数
    /// - path: population.json 路径
    pub fn from_path(path: &Path) -> CatalogResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), regions = catalog.region_count(), "人口参考数据加载完成");
        Ok(catalog)
    }

    /// 从 JSON 文本构建并校验
    ///
    /// # 返回
    /// - Ok(RegionCatalog)
    /// - Err(CatalogError::Malformed): 未知层级/州简称、人口非正整数、区域名为空
    pub fn from_json_str(raw: &str) -> CatalogResult<Self> {
        let doc: Value = serde_json::from_str(raw)?;
        let root = doc
            .as_object()
            .ok_or_else(|| CatalogError::Malformed("顶层必须是 JSON 对象".to_string()))?;

        let mut catalog = RegionCatalog::default();

        for (kind_key, body) in root {
            let kind: RegionKind = kind_key.parse().map_err(CatalogError::Malformed)?;
            let by_state = body.as_object().ok_or_else(|| {
                CatalogError::Malformed(format!("{}: 必须是 州简称 → ... 的对象", kind_key))
            })?;

            for (state_key, entry) in by_state {
                let state: FederalState = state_key
                    .parse()
                    .map_err(|e: String| CatalogError::Malformed(format!("{}: {}", kind_key, e)))?;

                if kind == RegionKind::State {
                    let population = parse_population(entry, &format!("state.{}", state_key))?;
                    catalog.states.insert(state, population);
                    continue;
                }

                let names = entry.as_object().ok_or_else(|| {
                    CatalogError::Malformed(format!("{}.{}: 必须是 区域名 → 人口 的对象", kind_key, state_key))
                })?;

                let table = catalog.regions.entry((kind, state)).or_default();
                for (name, value) in names {
                    if name.trim().is_empty() || name.trim() != name {
                        return Err(CatalogError::Malformed(format!(
                            "{}.{}: 区域名为空或含首尾空白: '{}'",
                            kind_key, state_key, name
                        )));
                    }
                    let population =
                        parse_population(value, &format!("{}.{}.{}", kind_key, state_key, name))?;
                    table.insert(name.clone(), population);
                }
            }
        }

        if catalog.states.is_empty() {
            return Err(CatalogError::Malformed("缺少 state 人口表".to_string()));
        }

        debug!(
            states = catalog.states.len(),
            regions = catalog.region_count(),
            "人口参考数据校验通过"
        );
        Ok(catalog)
    }

    /// 查询区域人口
    ///
    /// # 参数
    /// - kind: 层级（State 时忽略 name）
    /// - state: 联邦州
    /// - name: 规范名（市不带后缀）
    pub fn lookup(&self, kind: RegionKind, state: FederalState, name: &str) -> CatalogResult<u64> {
        let found = match kind {
            RegionKind::State => self.states.get(&state).copied(),
            _ => self
                .regions
                .get(&(kind, state))
                .and_then(|table| table.get(name))
                .copied(),
        };

        found.ok_or_else(|| CatalogError::NotFound {
            kind,
            state,
            name: name.to_string(),
        })
    }

    /// 州人口
    pub fn state_population(&self, state: FederalState) -> CatalogResult<u64> {
        self.lookup(RegionKind::State, state, state.short())
    }

    pub fn contains(&self, kind: RegionKind, state: FederalState, name: &str) -> bool {
        self.lookup(kind, state, name).is_ok()
    }

    /// 县 + 市条目总数
    pub fn region_count(&self) -> usize {
        self.regions.values().map(|t| t.len()).sum()
    }

    /// 已加载人口的联邦州
    pub fn states(&self) -> Vec<FederalState> {
        let mut states: Vec<FederalState> = self.states.keys().copied().collect();
        states.sort();
        states
    }

    /// 某州某层级下的全部区域（按名称排序）
    pub fn regions(&self, kind: RegionKind, state: FederalState) -> Vec<Region> {
        let mut regions: Vec<Region> = self
            .regions
            .get(&(kind, state))
            .map(|table| {
                table
                    .iter()
                    .map(|(name, population)| Region::new(kind, state, name.clone(), *population))
                    .collect()
            })
            .unwrap_or_default();
        regions.sort_by(|a, b| a.name.cmp(&b.name));
        regions
    }
}

fn parse_population(value: &Value, path: &str) -> CatalogResult<u64> {
    value
        .as_u64()
        .filter(|p| *p > 0)
        .ok_or_else(|| CatalogError::Malformed(format!("{}: 人口必须为正整数，实际 {}", path, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "state": {"BW": 11069533},
        "county": {"BW": {"Böblingen": 391640, "Heilbronn": 343068}},
        "city": {"BW": {"Heilbronn": 125960}}
    }"#;

    #[test]
    fn test_lookup_by_kind() {
        let catalog = RegionCatalog::from_json_str(SAMPLE).unwrap();

        assert_eq!(
            catalog.lookup(RegionKind::County, FederalState::Bw, "Heilbronn").unwrap(),
            343068
        );
        assert_eq!(
            catalog.lookup(RegionKind::City, FederalState::Bw, "Heilbronn").unwrap(),
            125960
        );
        assert_eq!(catalog.state_population(FederalState::Bw).unwrap(), 11069533);
        assert_eq!(catalog.region_count(), 3);
    }

    #[test]
    fn test_lookup_not_found() {
        let catalog = RegionCatalog::from_json_str(SAMPLE).unwrap();

        let err = catalog
            .lookup(RegionKind::City, FederalState::Bw, "Böblingen")
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));

        // 其他州没有数据
        assert!(catalog.state_population(FederalState::By).is_err());
    }

    #[test]
    fn test_malformed_population_rejected() {
        let raw = r#"{"state": {"BW": 0}}"#;
        assert!(matches!(
            RegionCatalog::from_json_str(raw),
            Err(CatalogError::Malformed(_))
        ));

        let raw = r#"{"state": {"BW": 1}, "county": {"BW": {"Calw": "viele"}}}"#;
        assert!(matches!(
            RegionCatalog::from_json_str(raw),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn test_malformed_structure_rejected() {
        // 未知层级
        let raw = r#"{"state": {"BW": 1}, "district": {}}"#;
        assert!(matches!(
            RegionCatalog::from_json_str(raw),
            Err(CatalogError::Malformed(_))
        ));

        // 未知州简称
        let raw = r#"{"state": {"XX": 1}}"#;
        assert!(matches!(
            RegionCatalog::from_json_str(raw),
            Err(CatalogError::Malformed(_))
        ));

        // 缺少 state 表
        let raw = r#"{"county": {"BW": {"Calw": 1}}}"#;
        assert!(matches!(
            RegionCatalog::from_json_str(raw),
            Err(CatalogError::Malformed(_))
        ));

        // 非 JSON
        assert!(matches!(
            RegionCatalog::from_json_str("not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_bundled_catalog_covers_all_states() {
        let catalog = RegionCatalog::bundled().unwrap();

        let mut expected = FederalState::ALL.to_vec();
        expected.sort();
        assert_eq!(catalog.states(), expected);
        assert!(catalog.contains(RegionKind::City, FederalState::Bw, "Stuttgart"));
        assert!(catalog.contains(RegionKind::County, FederalState::Nw, "Aachen"));
        assert!(catalog.contains(RegionKind::City, FederalState::Nw, "Aachen"));
        assert!(catalog.contains(RegionKind::County, FederalState::Ni, "Nienburg/Weser"));
    }

    #[test]
    fn test_regions_sorted() {
        let catalog = RegionCatalog::from_json_str(SAMPLE).unwrap();
        let names: Vec<String> = catalog
            .regions(RegionKind::County, FederalState::Bw)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Böblingen".to_string(), "Heilbronn".to_string()]);
    }
}

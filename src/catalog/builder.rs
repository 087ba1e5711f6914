// ==========================================
// 疫情通报采集系统 - 人口参考数据构建
// ==========================================
// 输入: states.csv (short,state,population)
//       counties.csv (state,county,population)
//       cities.csv (state,city,population)
// 输出: population.json（与 RegionCatalog 加载格式一致）
// ==========================================

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::region_catalog::RegionCatalog;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct StateRow {
    short: String,
    population: u64,
}

#[derive(Debug, Deserialize)]
struct CountyRow {
    state: String,
    county: String,
    population: u64,
}

#[derive(Debug, Deserialize)]
struct CityRow {
    state: String,
    city: String,
    population: u64,
}

type NamedTable = BTreeMap<String, BTreeMap<String, u64>>;

/// 从三个 CSV 读取器构建 population.json 文本
///
/// 输出先经 RegionCatalog 校验，保证可被加载
pub fn build_population_json<S: Read, C: Read, T: Read>(
    states: S,
    counties: C,
    cities: T,
) -> CatalogResult<String> {
    let mut state_table: BTreeMap<String, u64> = BTreeMap::new();
    for row in ReaderBuilder::new().trim(csv::Trim::All).from_reader(states).deserialize() {
        let row: StateRow = row?;
        state_table.insert(row.short, row.population);
    }

    let mut county_table: NamedTable = BTreeMap::new();
    for row in ReaderBuilder::new().trim(csv::Trim::All).from_reader(counties).deserialize() {
        let row: CountyRow = row?;
        county_table
            .entry(row.state)
            .or_default()
            .insert(row.county, row.population);
    }

    let mut city_table: NamedTable = BTreeMap::new();
    for row in ReaderBuilder::new().trim(csv::Trim::All).from_reader(cities).deserialize() {
        let row: CityRow = row?;
        city_table
            .entry(row.state)
            .or_default()
            .insert(row.city, row.population);
    }

    let document = serde_json::json!({
        "state": state_table,
        "county": county_table,
        "city": city_table,
    });
    let rendered = serde_json::to_string_pretty(&document)?;

    // 校验输出
    RegionCatalog::from_json_str(&rendered)?;
    Ok(rendered)
}

/// 从文件构建并写出 population.json
///
/// # 返回
/// - Ok(条目数): 县 + 市条目总数
pub fn build_population_file(
    states_csv: &Path,
    counties_csv: &Path,
    cities_csv: &Path,
    output: &Path,
) -> CatalogResult<usize> {
    let open = |path: &Path| {
        std::fs::File::open(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    };

    let rendered = build_population_json(open(states_csv)?, open(counties_csv)?, open(cities_csv)?)?;
    std::fs::write(output, &rendered).map_err(|e| CatalogError::Io {
        path: output.display().to_string(),
        message: e.to_string(),
    })?;

    let count = RegionCatalog::from_json_str(&rendered)?.region_count();
    info!(output = %output.display(), regions = count, "population.json 已生成");
    Ok(count)
}

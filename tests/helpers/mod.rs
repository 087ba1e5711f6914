// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、测试用人口数据、测试来源配置
// 测试替身见 test_doubles
// ==========================================

#![allow(dead_code, unused_imports)]

pub mod test_doubles;

pub use test_doubles::{FailingStore, RecordingNotifier};

use corona_ingest::catalog::RegionCatalog;
use corona_ingest::domain::types::{FederalState, ObservationKind};
use corona_ingest::importer::name_canonicalizer::{strip_prefix, RewriteRule};
use corona_ingest::importer::source_config::{
    ColumnRef, DateTimePattern, ExtractionStrategy, HeaderAnchor, HtmlTableConfig, LabelCell,
    RegionResolution, Sentinel, SentinelAction, SourceConfig, TimestampAnchor,
};
use corona_ingest::SqliteRecordStore;
use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 创建临时测试数据库（schema 在打开时建立）
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - SqliteRecordStore: 已建表的存储
pub fn create_test_store() -> Result<(NamedTempFile, SqliteRecordStore), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();
    let store = SqliteRecordStore::new(&db_path)?;
    Ok((temp_file, store))
}

/// 测试用人口数据
///
/// - SH: 240000
/// - 县 Beispiel: 120000
/// - 市 Musterstadt: 50000
/// - 县 / 市 Doppelstadt: 80000 / 20000
pub const TEST_POPULATION_JSON: &str = r#"{
    "state": { "SH": 240000, "BY": 13076721 },
    "county": { "SH": { "Beispiel": 120000, "Doppelstadt": 80000 } },
    "city": { "SH": { "Musterstadt": 50000, "Doppelstadt": 20000 } }
}"#;

pub fn test_catalog() -> Arc<RegionCatalog> {
    Arc::new(RegionCatalog::from_json_str(TEST_POPULATION_JSON).expect("测试人口数据无效"))
}

/// 测试来源: 带 "Landkreis" 表头的简单表格，合计行 "Summe"
pub fn test_source() -> SourceConfig {
    SourceConfig {
        state: FederalState::Sh,
        url: None,
        attachment_url: None,
        timestamp: TimestampAnchor::new(
            "p.stand",
            vec![DateTimePattern::datetime("%d.%m.%Y, %H:%M Uhr")],
        )
        .capture(r"(\d{1,2}\.\d{1,2}\.\d{4}, \d{1,2}:\d{2} Uhr)"),
        strategy: ExtractionStrategy::HtmlTable(HtmlTableConfig {
            table_selector: "table.fallzahlen".to_string(),
            header: HeaderAnchor {
                selector: "th".to_string(),
                index: 0,
                text: "Landkreis".to_string(),
            },
            row_selector: "tr".to_string(),
            skip_rows: 0,
            label: LabelCell::Td(0),
            expected_cells: vec![3],
            count_column: ColumnRef::Index(1),
            death_column: Some(ColumnRef::Index(2)),
        }),
        sentinels: vec![Sentinel::exact("Summe", SentinelAction::Total)],
        placeholders: vec!["-".to_string()],
        default_kind: ObservationKind::None,
        rules: vec![RewriteRule::always(vec![strip_prefix("Kreis ")])],
        resolution: RegionResolution::default(),
    }
}

/// 渲染测试页面
///
/// # 参数
/// - rows: (标签, 确诊, 死亡) 单元格文本
/// - total: 合计行（确诊, 死亡）
pub fn bulletin_page(rows: &[(&str, &str, &str)], total: Option<(&str, &str)>) -> String {
    let mut body = String::new();
    for (label, count, death) in rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            label, count, death
        ));
    }
    if let Some((count, death)) = total {
        body.push_str(&format!(
            "<tr><td>Summe</td><td>{}</td><td>{}</td></tr>\n",
            count, death
        ));
    }

    format!(
        r#"<html><body>
<p class="stand">Stand: 17.03.2020, 14:00 Uhr</p>
<table class="fallzahlen">
<tr><th>Landkreis</th><th>Fälle</th><th>Todesfälle</th></tr>
{}</table>
</body></html>"#,
        body
    )
}

// ==========================================
// 疫情通报采集系统 - HTML 表格抽取器
// ==========================================
// 表头锚点定位表格 → 逐行读取 → 非数据行按配置处理
// ==========================================

use super::{
    compile_selector, element_text, ensure_region_rows, find_timestamp, parse_count,
    strategy_mismatch, ExtractContext, RecordExtractor, SourceDocument,
};
use crate::domain::record::{Extraction, PublishedTotal, RawObservation};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::name_canonicalizer::normalize_whitespace;
use crate::importer::source_config::{
    ExtractionStrategy, HtmlTableConfig, LabelCell, SentinelAction, SourceConfig,
};
use scraper::{ElementRef, Html};
use tracing::debug;

pub struct HtmlTableExtractor;

impl RecordExtractor for HtmlTableExtractor {
    fn extract(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        ctx: &ExtractContext,
    ) -> ImportResult<Extraction> {
        let layout = match &source.strategy {
            ExtractionStrategy::HtmlTable(layout) => layout,
            _ => return Err(strategy_mismatch(source, "html-table")),
        };

        let html = Html::parse_document(&document.page);
        let timestamp = find_timestamp(source, html.root_element(), ctx)?;
        let table = locate_table(source, &html, layout)?;
        let (observations, published_total) = read_rows(source, layout, table)?;

        ensure_region_rows(source, &observations, published_total.as_ref())?;

        debug!(
            state = %source.state,
            rows = observations.len(),
            has_total = published_total.is_some(),
            "表格抽取完成"
        );

        Ok(Extraction {
            timestamp,
            observations,
            published_total,
        })
    }
}

/// 按表头锚点定位数据表
fn locate_table<'a>(
    source: &SourceConfig,
    html: &'a Html,
    layout: &HtmlTableConfig,
) -> ImportResult<ElementRef<'a>> {
    let table_selector = compile_selector(&layout.table_selector)?;
    let header_selector = compile_selector(&layout.header.selector)?;
    let expected = normalize_whitespace(&layout.header.text);

    html.select(&table_selector)
        .find(|table| {
            table
                .select(&header_selector)
                .nth(layout.header.index)
                .map(|cell| element_text(cell).starts_with(expected.as_str()))
                .unwrap_or(false)
        })
        .ok_or_else(|| ImportError::AnchorNotFound {
            state: source.state,
            anchor: layout.header.text.clone(),
        })
}

fn read_rows(
    source: &SourceConfig,
    layout: &HtmlTableConfig,
    table: ElementRef<'_>,
) -> ImportResult<(Vec<RawObservation>, Option<PublishedTotal>)> {
    let row_selector = compile_selector(&layout.row_selector)?;
    let td_selector = compile_selector("td")?;
    let th_selector = compile_selector("th")?;

    let mut kind = source.default_kind;
    let mut observations = Vec::new();
    let mut published_total = None;

    for (idx, row) in table.select(&row_selector).enumerate().skip(layout.skip_rows) {
        let row_number = idx + 1;
        let cells: Vec<String> = row.select(&td_selector).map(element_text).collect();
        // 纯表头行
        if cells.is_empty() {
            continue;
        }

        let label = match layout.label {
            LabelCell::Th => row.select(&th_selector).next().map(element_text),
            LabelCell::Td(col) => cells.get(col).cloned(),
        };
        let Some(label) = label else {
            continue;
        };
        if label.is_empty() {
            continue;
        }

        match source.sentinel_for(&label) {
            Some(SentinelAction::Skip) => continue,
            Some(SentinelAction::Stop) => break,
            Some(SentinelAction::Section(section_kind)) => {
                kind = section_kind;
                continue;
            }
            Some(action @ (SentinelAction::Total | SentinelAction::TotalAndStop)) => {
                let (infected, deaths) = read_counts(source, layout, &cells, row_number)?;
                published_total = Some(PublishedTotal { infected, deaths });
                if action == SentinelAction::TotalAndStop {
                    break;
                }
                continue;
            }
            None => {}
        }

        if !layout.expected_cells.is_empty() && !layout.expected_cells.contains(&cells.len()) {
            return Err(ImportError::ColumnCount {
                state: source.state,
                row: row_number,
                expected: describe_expected(&layout.expected_cells),
                actual: cells.len(),
            });
        }

        let (infected, deaths) = read_counts(source, layout, &cells, row_number)?;
        observations.push(RawObservation {
            state: source.state,
            region_label: label,
            region_kind: kind,
            infected,
            deaths,
            row_number,
        });
    }

    Ok((observations, published_total))
}

fn read_counts(
    source: &SourceConfig,
    layout: &HtmlTableConfig,
    cells: &[String],
    row: usize,
) -> ImportResult<(u64, Option<u64>)> {
    let column_error = || ImportError::ColumnCount {
        state: source.state,
        row,
        expected: describe_expected(&layout.expected_cells),
        actual: cells.len(),
    };

    let count_idx = layout.count_column.resolve(cells.len()).ok_or_else(column_error)?;
    let infected = parse_count(source, row, "count", &cells[count_idx])?;

    let deaths = match layout.death_column {
        Some(column) => {
            let idx = column.resolve(cells.len()).ok_or_else(column_error)?;
            Some(parse_count(source, row, "death", &cells[idx])?)
        }
        None => None,
    };

    Ok((infected, deaths))
}

fn describe_expected(expected: &[usize]) -> String {
    if expected.is_empty() {
        return "≥1".to_string();
    }
    expected
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::format_timestamp;
    use crate::domain::types::{FederalState, ObservationKind};
    use crate::importer::sources::source_for;

    fn ctx() -> ExtractContext {
        ExtractContext::with_year(2020)
    }

    const BAYERN_PAGE: &str = r#"
<html><body>
<p class="bildunterschrift">Stand: 17.03.2020, 10:00 Uhr</p>
<div class="row abstand_unten">
<table>
  <tr><th>Landkreis/Stadt</th><th>Anzahl</th><th>a</th><th>b</th><th>c</th><th>d</th><th>Todesfälle</th><th>e</th></tr>
  <tr><td>Augsburg Stadt</td><td>1.024</td><td>1</td><td>1</td><td>1</td><td>1</td><td>3</td><td>1</td></tr>
  <tr><td>Bad Tölz</td><td>57</td><td>1</td><td>1</td><td>1</td><td>1</td><td>-</td><td>1</td></tr>
  <tr><td>Gesamtergebnis</td><td>1.081</td><td>1</td><td>1</td><td>1</td><td>1</td><td>3</td><td>1</td></tr>
</table>
</div>
</body></html>
"#;

    #[test]
    fn test_bayern_table() {
        let source = source_for(FederalState::By);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(BAYERN_PAGE), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T10:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "Augsburg Stadt");
        assert_eq!(extraction.observations[0].infected, 1024);
        assert_eq!(extraction.observations[0].deaths, Some(3));
        assert_eq!(extraction.observations[1].deaths, Some(0));
        assert_eq!(
            extraction.published_total,
            Some(PublishedTotal {
                infected: 1081,
                deaths: Some(3)
            })
        );
    }

    #[test]
    fn test_missing_header_anchor_is_structural_error() {
        let source = source_for(FederalState::By);
        let page = BAYERN_PAGE.replace("Landkreis/Stadt", "Kreis");
        let err = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap_err();
        assert!(matches!(err, ImportError::AnchorNotFound { .. }));
    }

    #[test]
    fn test_column_count_mismatch() {
        let source = source_for(FederalState::By);
        let page = BAYERN_PAGE.replace(
            "<td>57</td><td>1</td>",
            "<td>57</td>",
        );
        let err = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::ColumnCount {
                actual: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_rheinland_pfalz_sections_and_stop_row() {
        let page = r#"
<table><tbody>
  <tr><td>Landkreis</td><td>Fälle</td><td>Todesfälle</td></tr>
  <tr><td>LK Mainz-Bingen</td><td>12</td><td></td></tr>
  <tr><td>Stadt</td><td></td><td></td></tr>
  <tr><td>KS Mainz</td><td>30</td><td>1</td></tr>
  <tr><td>Stand: 17.03.2020; 10 Uhr</td><td></td><td></td></tr>
</tbody></table>
"#;
        let source = source_for(FederalState::Rp);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T10:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_kind, ObservationKind::County);
        assert_eq!(extraction.observations[0].deaths, Some(0));
        assert_eq!(extraction.observations[1].region_kind, ObservationKind::City);
        assert_eq!(extraction.observations[1].region_label, "KS Mainz");
        assert!(extraction.published_total.is_none());
    }

    #[test]
    fn test_thueringen_th_label_and_year_in_caption() {
        let page = r#"
<section class="th-box"><h2>Corona-Fälle (Stand: 18. März 2020, 10 Uhr)</h2></section>
<table class="table table-striped">
  <thead><tr><th>Kreis</th><th>Fälle</th><th>aktueller Stand</th></tr></thead>
  <tbody>
    <tr><th>Erfurt</th><td>-</td><td>20</td><td>0</td><td>0</td><td>0</td><td>0</td><td>1</td></tr>
    <tr><th>Summe</th><td>-</td><td>20</td><td>0</td><td>0</td><td>0</td><td>0</td><td>1</td></tr>
  </tbody>
</table>
"#;
        let source = source_for(FederalState::Th);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-18T10:00:00Z");
        assert_eq!(extraction.observations.len(), 1);
        assert_eq!(extraction.observations[0].region_label, "Erfurt");
        assert_eq!(extraction.observations[0].infected, 20);
        assert_eq!(extraction.observations[0].deaths, Some(1));
        assert_eq!(extraction.published_total.map(|t| t.infected), Some(20));
    }

    #[test]
    fn test_schleswig_holstein_last_column_without_year() {
        let page = r#"
<table>
  <thead><tr><th>Kreis / kreisfreie Stadt</th><th>Stand 17.03. 09:00 Uhr</th></tr></thead>
  <tbody>
    <tr><td>Nordfriesland</td><td>7</td></tr>
    <tr><td>Kiel</td><td>x</td><td>11</td></tr>
    <tr><td>SUMME</td><td>18</td></tr>
  </tbody>
</table>
"#;
        let source = source_for(FederalState::Sh);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T09:00:00Z");
        assert_eq!(extraction.observations[1].infected, 11);
        assert_eq!(extraction.observations[1].deaths, None);
        assert_eq!(extraction.published_total.map(|t| t.infected), Some(18));
    }

    #[test]
    fn test_total_row_before_counties_keeps_reading() {
        let page = r#"
<div class="text-col"><p>Stand: 18. März 2020, 12:00 Uhr</p></div>
<table>
  <thead><tr><th>Kreisfreie Stadt / Landkreis</th><th>Fälle</th></tr></thead>
  <tbody>
    <tr><td>Gesamtzahl der Infektionen</td><td>30</td></tr>
    <tr><td>Stadt Leipzig</td><td>20 (+3)</td></tr>
    <tr><td>Landkreis Leipzig</td><td>10</td></tr>
  </tbody>
</table>
"#;
        let source = source_for(FederalState::Sn);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-18T12:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "Stadt Leipzig");
        assert_eq!(extraction.observations[0].infected, 20);
        assert_eq!(extraction.observations[1].region_label, "Landkreis Leipzig");
        assert_eq!(extraction.observations[1].infected, 10);
        assert_eq!(extraction.observations[1].deaths, None);
        assert_eq!(
            extraction.published_total,
            Some(PublishedTotal {
                infected: 30,
                deaths: None
            })
        );
    }

    #[test]
    fn test_total_without_region_rows_is_structural_error() {
        let page = r#"
<div class="text-col"><p>Stand: 18. März 2020, 12:00 Uhr</p></div>
<table>
  <thead><tr><th>Kreisfreie Stadt / Landkreis</th><th>Fälle</th></tr></thead>
  <tbody>
    <tr><td>Gesamtzahl der Infektionen</td><td>30</td></tr>
  </tbody>
</table>
"#;
        let source = source_for(FederalState::Sn);
        let err = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::TotalWithoutRegions {
                state: FederalState::Sn,
                published: 30
            }
        ));
        assert_eq!(err.kind(), crate::importer::error::FailureKind::Structural);
    }

    #[test]
    fn test_bayern_stops_after_total_row() {
        let source = source_for(FederalState::By);
        let page = BAYERN_PAGE.replace(
            "</table>",
            "<tr><td>Quelle: LGL</td></tr></table>",
        );
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.published_total.map(|t| t.infected), Some(1081));
    }

    #[test]
    fn test_brandenburg_table() {
        let page = r#"
<table><tbody>
  <tr>
    <td><p><strong>Landkreis/kreisfreie Stadt</strong></p></td>
    <td><p><strong>Fälle</strong></p></td>
    <td><p><strong>Pressemitteilung</strong></p><p><strong>Stand: 17.03., 10:00 Uhr</strong></p></td>
  </tr>
  <tr><td><p><strong>Barnim</strong></p></td><td><p><strong>5</strong></p></td></tr>
  <tr><td><p><strong>Brandenburg a. d. Havel</strong></p></td><td><p><strong>---</strong></p></td></tr>
  <tr><td><p><strong>Brandenburg gesamt</strong></p></td><td><p><strong>5</strong></p></td></tr>
</tbody></table>
"#;
        let source = source_for(FederalState::Bb);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T10:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "Barnim");
        assert_eq!(extraction.observations[0].infected, 5);
        assert_eq!(extraction.observations[1].region_label, "Brandenburg a. d. Havel");
        assert_eq!(extraction.observations[1].infected, 0);
        assert_eq!(extraction.observations[1].deaths, None);
        assert_eq!(extraction.published_total.map(|t| t.infected), Some(5));
    }

    #[test]
    fn test_bremen_th_labels() {
        let page = r#"
<p><span class="article_time">18.03.2020</span></p>
<table>
  <tr><th>Bestätigte Fälle insgesamt</th></tr>
  <tr><th>Stadtgemeinde Bremen</th><td>70</td></tr>
  <tr><th>Stadtgemeinde Bremerhaven</th><td>4</td></tr>
  <tr><th>Land Bremen</th><td>74</td></tr>
</table>
"#;
        let source = source_for(FederalState::Hb);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-18T12:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "Stadtgemeinde Bremen");
        assert_eq!(extraction.observations[0].region_kind, ObservationKind::City);
        assert_eq!(extraction.observations[0].infected, 70);
        assert_eq!(extraction.observations[1].infected, 4);
        assert_eq!(extraction.published_total.map(|t| t.infected), Some(74));
    }

    #[test]
    fn test_hessen_table_with_deaths() {
        let page = r#"
<p>Bestätigte Fälle in Hessen (Stand: 17.03.2020, 14:00 Uhr)</p>
<table>
  <thead><tr><th>Kreis/Stadt</th><th>Fälle</th><th>Todesfälle</th></tr></thead>
  <tbody>
    <tr><td>LK Bergstraße</td><td>12</td><td>-</td></tr>
    <tr><td>SK Offenbach</td><td>5</td><td>1</td></tr>
    <tr><td>Gesamt</td><td>17</td><td>1</td></tr>
  </tbody>
</table>
"#;
        let source = source_for(FederalState::He);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T14:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "LK Bergstraße");
        assert_eq!(extraction.observations[0].infected, 12);
        assert_eq!(extraction.observations[0].deaths, Some(0));
        assert_eq!(extraction.observations[1].region_label, "SK Offenbach");
        assert_eq!(extraction.observations[1].deaths, Some(1));
        assert_eq!(
            extraction.published_total,
            Some(PublishedTotal {
                infected: 17,
                deaths: Some(1)
            })
        );
    }

    #[test]
    fn test_mecklenburg_vorpommern_last_column() {
        let page = r#"
<table>
  <tr><td><p><strong>Landkreis / kreisfreie Stadt</strong></p></td><td><p><strong>Fälle</strong></p></td></tr>
  <tr><td><p><strong>Meldungen</strong></p></td><td><p><strong>Stand 17.03. 15:30 Uhr</strong></p></td></tr>
  <tr><td><p>Hansestadt Rostock</p></td><td><p>3</p></td><td><p>12</p></td></tr>
  <tr><td><p>Landkreis Vorpommern-Greifswald</p></td><td><p>2</p></td><td><p>4</p></td></tr>
  <tr><td><p>SUMME</p></td><td><p>5</p></td><td><p>16</p></td></tr>
</table>
"#;
        let source = source_for(FederalState::Mv);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T15:30:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "Hansestadt Rostock");
        assert_eq!(extraction.observations[0].infected, 12);
        assert_eq!(
            extraction.observations[1].region_label,
            "Landkreis Vorpommern-Greifswald"
        );
        assert_eq!(extraction.observations[1].infected, 4);
        assert_eq!(extraction.published_total.map(|t| t.infected), Some(16));
    }

    #[test]
    fn test_nordrhein_westfalen_table() {
        let page = r#"
<div class="field-item even">
  <p>Bestätigte Infektionen in Nordrhein-Westfalen</p>
  <p>Landesweit bestätigte Fälle, Stand: 19. März 2020, 10:00 Uhr.</p>
</div>
<table>
  <thead><tr><th>Landkreis/ kreisfreie Stadt</th><th>Bestätigte Fälle</th><th>Todesfälle</th><th>Genesene</th></tr></thead>
  <tbody>
    <tr><td>Aachen &amp; Städteregion Aachen</td><td>1.024</td><td>2</td><td>10</td></tr>
    <tr><td>Mülheim / Ruhr*</td><td>35</td><td>-</td><td>0</td></tr>
    <tr><td>Gesamt</td><td>1.059</td><td>2</td><td>10</td></tr>
  </tbody>
</table>
"#;
        let source = source_for(FederalState::Nw);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-19T10:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(
            extraction.observations[0].region_label,
            "Aachen & Städteregion Aachen"
        );
        assert_eq!(extraction.observations[0].infected, 1024);
        assert_eq!(extraction.observations[0].deaths, Some(2));
        assert_eq!(extraction.observations[1].region_label, "Mülheim / Ruhr*");
        assert_eq!(extraction.observations[1].deaths, Some(0));
        assert_eq!(
            extraction.published_total,
            Some(PublishedTotal {
                infected: 1059,
                deaths: Some(2)
            })
        );
    }

    #[test]
    fn test_sachsen_anhalt_compact_timestamp() {
        let page = r#"
<p><span>Fallzahlen in Sachsen-Anhalt (Stand: 17. März 2020, 10:00 Uhr)</span></p>
<table><tbody>
  <tr><td><p>Melde-Landkreis</p></td><td><p>Anzahl</p></td><td><p>Inzidenz</p></td><td><p>Todesfälle</p></td></tr>
  <tr><td><p>SK Halle</p></td><td><p>9</p></td><td><p>3,8</p></td><td><p>0</p></td></tr>
  <tr><td><p>LK Harz</p></td><td><p>4</p></td><td><p>1,9</p></td><td><p>1</p></td></tr>
  <tr><td><p>Gesamtergebnis</p></td><td><p>13</p></td><td><p>0,6</p></td><td><p>1</p></td></tr>
</tbody></table>
"#;
        let source = source_for(FederalState::St);
        let extraction = HtmlTableExtractor
            .extract(&source, &SourceDocument::page(page), &ctx())
            .unwrap();

        assert_eq!(format_timestamp(&extraction.timestamp), "2020-03-17T10:00:00Z");
        assert_eq!(extraction.observations.len(), 2);
        assert_eq!(extraction.observations[0].region_label, "SK Halle");
        assert_eq!(extraction.observations[0].infected, 9);
        assert_eq!(extraction.observations[0].deaths, Some(0));
        assert_eq!(extraction.observations[1].region_label, "LK Harz");
        assert_eq!(extraction.observations[1].deaths, Some(1));
        assert_eq!(
            extraction.published_total,
            Some(PublishedTotal {
                infected: 13,
                deaths: Some(1)
            })
        );
    }
}

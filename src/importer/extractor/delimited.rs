// ==========================================
// 疫情通报采集系统 - 分隔文本抽取器
// ==========================================
// 页面给出通报时间，附件 CSV 给出分县数据（按列名取值）
// ==========================================

use super::{
    ensure_region_rows, find_timestamp, parse_count, strategy_mismatch, ExtractContext,
    RecordExtractor, SourceDocument,
};
use crate::domain::record::{Extraction, PublishedTotal, RawObservation};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::name_canonicalizer::normalize_whitespace;
use crate::importer::source_config::{
    DelimitedConfig, ExtractionStrategy, SentinelAction, SourceConfig,
};
use csv::ReaderBuilder;
use scraper::Html;
use tracing::debug;

pub struct DelimitedExtractor;

impl RecordExtractor for DelimitedExtractor {
    fn extract(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        ctx: &ExtractContext,
    ) -> ImportResult<Extraction> {
        let layout = match &source.strategy {
            ExtractionStrategy::Delimited(layout) => layout,
            _ => return Err(strategy_mismatch(source, "delimited")),
        };

        let html = Html::parse_document(&document.page);
        let timestamp = find_timestamp(source, html.root_element(), ctx)?;

        let bytes = document
            .attachment
            .as_ref()
            .ok_or(ImportError::MissingAttachment(source.state))?;
        let (observations, published_total) = read_delimited(source, layout, bytes)?;

        ensure_region_rows(source, &observations, published_total.as_ref())?;

        debug!(state = %source.state, rows = observations.len(), "CSV 抽取完成");

        Ok(Extraction {
            timestamp,
            observations,
            published_total,
        })
    }
}

fn read_delimited(
    source: &SourceConfig,
    layout: &DelimitedConfig,
    bytes: &[u8],
) -> ImportResult<(Vec<RawObservation>, Option<PublishedTotal>)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(layout.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| normalize_whitespace(h.trim_start_matches('\u{feff}')))
        .collect();

    let column = |name: &str| -> ImportResult<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ImportError::AnchorNotFound {
                state: source.state,
                anchor: name.to_string(),
            })
    };
    let label_idx = column(&layout.label_column)?;
    let count_idx = column(&layout.count_column)?;
    let death_idx = match &layout.death_column {
        Some(name) => Some(column(name)?),
        None => None,
    };

    let mut observations = Vec::new();
    let mut published_total = None;

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        // 表头占第 1 行
        let row_number = idx + 2;

        let label = normalize_whitespace(record.get(label_idx).unwrap_or(""));
        if label.is_empty() {
            continue;
        }

        let action = source.sentinel_for(&label);
        match action {
            Some(SentinelAction::Skip) | Some(SentinelAction::Section(_)) => continue,
            Some(SentinelAction::Stop) => break,
            _ => {}
        }

        let field = |col: usize, name: &str| -> ImportResult<u64> {
            let raw = record.get(col).ok_or_else(|| ImportError::ColumnCount {
                state: source.state,
                row: row_number,
                expected: format!(">{}", col),
                actual: record.len(),
            })?;
            parse_count(source, row_number, name, raw)
        };

        let infected = field(count_idx, "count")?;
        let deaths = match death_idx {
            Some(col) => Some(field(col, "death")?),
            None => None,
        };

        match action {
            Some(SentinelAction::Total) => {
                published_total = Some(PublishedTotal { infected, deaths });
                continue;
            }
            Some(SentinelAction::TotalAndStop) => {
                published_total = Some(PublishedTotal { infected, deaths });
                break;
            }
            _ => {}
        }

        observations.push(RawObservation {
            state: source.state,
            region_label: label,
            region_kind: source.default_kind,
            infected,
            deaths,
            row_number,
        });
    }

    Ok((observations, published_total))
}

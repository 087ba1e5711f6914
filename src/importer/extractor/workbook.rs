// ==========================================
// 疫情通报采集系统 - 工作簿抽取器
// ==========================================
// 页面给出通报时间，附件 xlsx 给出分县数据
// 确诊与死亡分处两张工作表，按规范前标签对齐
// 红线: 工作簿日期必须等于页面日期，否则视为尚未发布
// ==========================================

use super::{
    ensure_region_rows, find_timestamp, parse_count, strategy_mismatch, ExtractContext,
    RecordExtractor, SourceDocument,
};
use crate::domain::record::{Extraction, PublishedTotal, RawObservation};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::name_canonicalizer::normalize_whitespace;
use crate::importer::source_config::{
    ExtractionStrategy, SentinelAction, SourceConfig, WorkbookConfig,
};
use calamine::{Data, DataType, Range, Reader, Xlsx};
use chrono::{DateTime, NaiveDate, Utc};
use scraper::Html;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

pub struct WorkbookExtractor;

impl RecordExtractor for WorkbookExtractor {
    fn extract(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        ctx: &ExtractContext,
    ) -> ImportResult<Extraction> {
        let layout = match &source.strategy {
            ExtractionStrategy::Workbook(layout) => layout,
            _ => return Err(strategy_mismatch(source, "workbook")),
        };

        let html = Html::parse_document(&document.page);
        let timestamp = find_timestamp(source, html.root_element(), ctx)?;

        let bytes = document
            .attachment
            .as_ref()
            .ok_or(ImportError::MissingAttachment(source.state))?;
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.clone()))?;

        let infected = workbook.worksheet_range(&layout.infected_sheet)?;
        let deaths = match &layout.deaths_sheet {
            Some(sheet) => Some(workbook.worksheet_range(sheet)?),
            None => None,
        };

        extract_from_ranges(source, layout, timestamp, &infected, deaths.as_ref())
    }
}

/// 单张工作表的读取结果
#[derive(Debug)]
struct SheetData {
    date: Option<NaiveDate>,
    rows: Vec<(String, u64, usize)>, // (标签, 数值, 行号)
    total: Option<u64>,
}

/// 从已加载的工作表区域抽取
pub(crate) fn extract_from_ranges(
    source: &SourceConfig,
    layout: &WorkbookConfig,
    timestamp: DateTime<Utc>,
    infected: &Range<Data>,
    deaths: Option<&Range<Data>>,
) -> ImportResult<Extraction> {
    let infected_sheet = read_sheet(source, layout, infected, "count")?;

    let page_date = timestamp.date_naive();
    match infected_sheet.date {
        Some(date) if date == page_date => {}
        other => {
            return Err(ImportError::DateMismatch {
                state: source.state,
                page: page_date.format("%d.%m.%Y").to_string(),
                attachment: other
                    .map(|d| d.format("%d.%m.%Y").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            })
        }
    }

    let deaths_sheet = match deaths {
        Some(range) => Some(read_sheet(source, layout, range, "death")?),
        None => None,
    };
    let deaths_by_label: Option<HashMap<&str, u64>> = deaths_sheet.as_ref().map(|sheet| {
        sheet
            .rows
            .iter()
            .map(|(label, value, _)| (label.as_str(), *value))
            .collect()
    });

    let observations: Vec<RawObservation> = infected_sheet
        .rows
        .iter()
        .map(|(label, count, row_number)| RawObservation {
            state: source.state,
            region_label: label.clone(),
            region_kind: source.default_kind,
            infected: *count,
            // 死亡表缺失的县记为 0
            deaths: deaths_by_label
                .as_ref()
                .map(|map| map.get(label.as_str()).copied().unwrap_or(0)),
            row_number: *row_number,
        })
        .collect();

    let published_total = infected_sheet.total.map(|infected| PublishedTotal {
        infected,
        deaths: deaths_sheet.as_ref().and_then(|sheet| sheet.total),
    });

    ensure_region_rows(source, &observations, published_total.as_ref())?;

    debug!(
        state = %source.state,
        rows = observations.len(),
        "工作簿抽取完成"
    );

    Ok(Extraction {
        timestamp,
        observations,
        published_total,
    })
}

fn read_sheet(
    source: &SourceConfig,
    layout: &WorkbookConfig,
    range: &Range<Data>,
    field: &str,
) -> ImportResult<SheetData> {
    let rows: Vec<&[Data]> = range.rows().collect();

    let anchor = rows
        .iter()
        .position(|row| cell_label(row, layout.label_column).starts_with(&layout.anchor_prefix))
        .ok_or_else(|| ImportError::AnchorNotFound {
            state: source.state,
            anchor: layout.anchor_prefix.clone(),
        })?;

    let date = rows
        .get(anchor + 1)
        .and_then(|row| row.get(layout.date_column))
        .and_then(cell_date);

    let mut data = Vec::new();
    let mut total = None;
    for (idx, row) in rows.iter().enumerate().skip(anchor + 2) {
        let row_number = idx + 1;
        let label = cell_label(row, layout.label_column);
        if label.is_empty() {
            continue;
        }

        let action = source.sentinel_for(&label);
        if matches!(action, Some(SentinelAction::Skip) | Some(SentinelAction::Section(_))) {
            continue;
        }
        if matches!(action, Some(SentinelAction::Stop)) {
            break;
        }

        let value = match row.get(layout.count_column) {
            Some(cell) => cell_count(source, row_number, field, cell)?,
            None => {
                return Err(ImportError::ColumnCount {
                    state: source.state,
                    row: row_number,
                    expected: format!(">{}", layout.count_column),
                    actual: row.len(),
                })
            }
        };

        match action {
            Some(SentinelAction::Total) => {
                total = Some(value);
                continue;
            }
            Some(SentinelAction::TotalAndStop) => {
                total = Some(value);
                break;
            }
            _ => {}
        }
        data.push((label, value, row_number));
    }

    Ok(SheetData {
        date,
        rows: data,
        total,
    })
}

fn cell_label(row: &[Data], column: usize) -> String {
    row.get(column)
        .map(|cell| normalize_whitespace(&cell.to_string()))
        .unwrap_or_default()
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::String(s) => {
            let text = s.trim();
            NaiveDate::parse_from_str(text, "%d.%m.%Y")
                .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
                .ok()
        }
        other => other.as_datetime().map(|dt| dt.date()),
    }
}

fn cell_count(source: &SourceConfig, row: usize, field: &str, cell: &Data) -> ImportResult<u64> {
    match cell {
        Data::Int(v) if *v >= 0 => Ok(*v as u64),
        Data::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Ok(*v as u64),
        Data::String(s) => parse_count(source, row, field, s),
        Data::Empty => parse_count(source, row, field, ""),
        other => Err(ImportError::InvalidNumber {
            state: source.state,
            row,
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

// ==========================================
// 疫情通报采集系统 - 记录抽取器
// ==========================================
// 职责: 按来源配置把原始文档转换为 Extraction
// 四种策略: HTML 表格 / 工作簿 / 分隔文本 / 正文
// 红线: 锚点缺失即结构错误，绝不部分抽取
// ==========================================

pub mod datetime;
pub mod delimited;
pub mod html_table;
pub mod prose;
pub mod workbook;

use crate::domain::record::{Extraction, PublishedTotal, RawObservation};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::name_canonicalizer::normalize_whitespace;
use crate::importer::source_config::{ExtractionStrategy, SourceConfig};
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use scraper::{ElementRef, Selector};

pub use delimited::DelimitedExtractor;
pub use html_table::HtmlTableExtractor;
pub use prose::ProseExtractor;
pub use workbook::WorkbookExtractor;

// ==========================================
// 输入文档
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    pub page: String,                // 主页面 HTML
    pub attachment: Option<Vec<u8>>, // 附件（xlsx / csv）
}

impl SourceDocument {
    pub fn page(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, bytes: Vec<u8>) -> Self {
        self.attachment = Some(bytes);
        self
    }
}

/// 抽取上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractContext {
    pub reference_year: i32,                // 时间戳文本不含年份时使用
    pub fetched_at: Option<DateTime<Utc>>, // 有值时据抓取时刻推断年份
}

impl ExtractContext {
    /// 显式指定参考年份
    pub fn with_year(reference_year: i32) -> Self {
        Self {
            reference_year,
            fetched_at: None,
        }
    }

    /// 以抓取时刻为准: 推断结果晚于抓取时刻一天以上时退回上一年
    pub fn fetched_at(now: DateTime<Utc>) -> Self {
        Self {
            reference_year: now.year(),
            fetched_at: Some(now),
        }
    }
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self::fetched_at(Utc::now())
    }
}

// ==========================================
// RecordExtractor Trait
// ==========================================
pub trait RecordExtractor: Send + Sync {
    /// 抽取一份通报
    ///
    /// # 返回
    /// - Ok(Extraction): 时间戳 + 按文档顺序的观测 + 来源合计
    /// - Err: 锚点缺失、列数不符、数值无法解析等结构错误
    fn extract(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        ctx: &ExtractContext,
    ) -> ImportResult<Extraction>;
}

/// 按策略选择抽取器
pub fn extractor_for(strategy: &ExtractionStrategy) -> Box<dyn RecordExtractor> {
    match strategy {
        ExtractionStrategy::HtmlTable(_) => Box::new(HtmlTableExtractor),
        ExtractionStrategy::Workbook(_) => Box::new(WorkbookExtractor),
        ExtractionStrategy::Delimited(_) => Box::new(DelimitedExtractor),
        ExtractionStrategy::Prose(_) => Box::new(ProseExtractor),
    }
}

// ==========================================
// 共用辅助
// ==========================================

pub(crate) fn strategy_mismatch(source: &SourceConfig, expected: &str) -> ImportError {
    ImportError::ConfigError {
        key: format!("{}.strategy", source.state),
        message: format!("期望 {}，实际 {}", expected, source.strategy.family()),
    }
}

pub(crate) fn compile_selector(selector: &str) -> ImportResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ImportError::SelectorError(format!("'{}': {:?}", selector, e)))
}

/// 元素文本（空白已归一）
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// 解析计数单元格
///
/// 去除千分位点与空白，截断 "(+n)" 增量注记；占位符视为 0
pub(crate) fn parse_count(
    source: &SourceConfig,
    row: usize,
    field: &str,
    raw: &str,
) -> ImportResult<u64> {
    let text = normalize_whitespace(raw);
    let text = match text.find("(+") {
        Some(pos) => text[..pos].trim().to_string(),
        None => text,
    };

    if source.is_placeholder(&text) {
        return Ok(0);
    }

    let digits: String = text.chars().filter(|c| *c != '.' && *c != ' ').collect();
    digits.parse::<u64>().map_err(|_| ImportError::InvalidNumber {
        state: source.state,
        row,
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// 分县来源至少要读到一行县/市数据
///
/// 只有合计行时说明版面变化（如合计行移到表头），不能当作成功
pub(crate) fn ensure_region_rows(
    source: &SourceConfig,
    observations: &[RawObservation],
    published_total: Option<&PublishedTotal>,
) -> ImportResult<()> {
    if !observations.is_empty() {
        return Ok(());
    }
    match published_total {
        Some(total) => Err(ImportError::TotalWithoutRegions {
            state: source.state,
            published: total.infected,
        }),
        None => Err(ImportError::EmptyExtraction(source.state)),
    }
}

/// 定位并解析通报时间戳
///
/// # 参数
/// - scope: 搜索范围（整页或单个条目）
pub(crate) fn find_timestamp(
    source: &SourceConfig,
    scope: ElementRef<'_>,
    ctx: &ExtractContext,
) -> ImportResult<DateTime<Utc>> {
    let anchor = &source.timestamp;
    let selector = compile_selector(&anchor.selector)?;

    let candidates: Vec<String> = scope
        .select(&selector)
        .map(element_text)
        .filter(|text| match &anchor.contains {
            Some(needle) => text.contains(needle.as_str()),
            None => true,
        })
        .collect();

    let picked = if anchor.pick_last {
        candidates.last()
    } else {
        candidates.first()
    };
    let text = picked.ok_or_else(|| ImportError::AnchorNotFound {
        state: source.state,
        anchor: anchor.selector.clone(),
    })?;

    let mut fragment = match &anchor.capture {
        Some(pattern) => {
            let re = Regex::new(pattern)?;
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| ImportError::TimestampNotFound {
                    state: source.state,
                    text: text.clone(),
                })?
        }
        None => text.clone(),
    };
    if anchor.compact {
        fragment.retain(|c| !c.is_whitespace());
    }

    let parsed = match ctx.fetched_at {
        Some(now) => datetime::parse_bulletin_time_near(&fragment, &anchor.patterns, now),
        None => datetime::parse_bulletin_time(&fragment, &anchor.patterns, ctx.reference_year),
    };
    parsed.ok_or_else(|| ImportError::TimestampNotFound {
        state: source.state,
        text: fragment.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FederalState;
    use crate::importer::sources::source_for;
    use scraper::Html;

    #[test]
    fn test_parse_count_variants() {
        let source = source_for(FederalState::Sn);
        assert_eq!(parse_count(&source, 1, "count", "1.234").unwrap(), 1234);
        assert_eq!(parse_count(&source, 1, "count", " 56 (+3)").unwrap(), 56);
        assert_eq!(parse_count(&source, 1, "count", "1\u{a0}002").unwrap(), 1002);
        assert_eq!(parse_count(&source, 1, "count", "-").unwrap(), 0);

        let err = parse_count(&source, 7, "count", "k.A.").unwrap_err();
        assert!(matches!(err, ImportError::InvalidNumber { row: 7, .. }));
    }

    #[test]
    fn test_find_timestamp_missing_anchor() {
        let source = source_for(FederalState::By);
        let html = Html::parse_document("<html><body><p>keine Angabe</p></body></html>");
        let err = find_timestamp(&source, html.root_element(), &ExtractContext::default())
            .unwrap_err();
        assert!(matches!(err, ImportError::AnchorNotFound { .. }));
    }

    #[test]
    fn test_find_timestamp_with_capture() {
        let source = source_for(FederalState::By);
        let html = Html::parse_document(
            r#"<p class="bildunterschrift">Stand: 17.03.2020, 10:00 Uhr; Quelle LGL</p>"#,
        );
        let ts = find_timestamp(&source, html.root_element(), &ExtractContext::default()).unwrap();
        assert_eq!(crate::domain::record::format_timestamp(&ts), "2020-03-17T10:00:00Z");
    }

    #[test]
    fn test_yearless_timestamp_rolls_back_across_new_year() {
        use chrono::TimeZone;

        let source = source_for(FederalState::Bb);
        let html = Html::parse_document(
            r#"<table><tbody><tr><td><p><strong>Stand: 31.12., 18:00 Uhr</strong></p></td></tr></tbody></table>"#,
        );

        let new_year = Utc.with_ymd_and_hms(2021, 1, 1, 8, 0, 0).unwrap();
        let ts = find_timestamp(&source, html.root_element(), &ExtractContext::fetched_at(new_year))
            .unwrap();
        assert_eq!(crate::domain::record::format_timestamp(&ts), "2020-12-31T18:00:00Z");

        let same_day = Utc.with_ymd_and_hms(2020, 12, 31, 20, 0, 0).unwrap();
        let ts = find_timestamp(&source, html.root_element(), &ExtractContext::fetched_at(same_day))
            .unwrap();
        assert_eq!(crate::domain::record::format_timestamp(&ts), "2020-12-31T18:00:00Z");

        // 显式年份不做回退
        let ts = find_timestamp(&source, html.root_element(), &ExtractContext::with_year(2021))
            .unwrap();
        assert_eq!(crate::domain::record::format_timestamp(&ts), "2021-12-31T18:00:00Z");
    }
}

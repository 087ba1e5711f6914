// ==========================================
// 疫情通报采集系统 - 正文抽取器
// ==========================================
// 仅州级: 从新闻稿正文中按正则取确诊总数与死亡总数
// ==========================================

use super::{
    compile_selector, element_text, find_timestamp, parse_count, strategy_mismatch,
    ExtractContext, RecordExtractor, SourceDocument,
};
use crate::domain::record::{Extraction, PublishedTotal};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::source_config::{ExtractionStrategy, ProseConfig, SourceConfig};
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

pub struct ProseExtractor;

impl RecordExtractor for ProseExtractor {
    fn extract(
        &self,
        source: &SourceConfig,
        document: &SourceDocument,
        ctx: &ExtractContext,
    ) -> ImportResult<Extraction> {
        let layout = match &source.strategy {
            ExtractionStrategy::Prose(layout) => layout,
            _ => return Err(strategy_mismatch(source, "prose")),
        };

        let count_patterns = compile_all(&layout.count_patterns)?;
        let death_patterns = compile_all(&layout.death_patterns)?;
        let html = Html::parse_document(&document.page);

        // 逐条目搜索时，时间戳取自命中的条目
        let (scope, infected) = match &layout.item_selector {
            Some(item_selector) => {
                let selector = compile_selector(item_selector)?;
                html.select(&selector)
                    .find_map(|item| {
                        let text = scoped_text(item, layout).ok()?;
                        first_match(&count_patterns, &text).map(|raw| (item, raw))
                    })
                    .ok_or_else(|| anchor_missing(source, layout))?
            }
            None => {
                let text = scoped_text(html.root_element(), layout)?;
                let raw = first_match(&count_patterns, &text)
                    .ok_or_else(|| anchor_missing(source, layout))?;
                (html.root_element(), raw)
            }
        };

        let timestamp = find_timestamp(source, scope, ctx)?;
        let infected = parse_count(source, 1, "count", &infected)?;

        let deaths = if death_patterns.is_empty() {
            None
        } else {
            let text = scoped_text(scope, layout)?;
            match first_match(&death_patterns, &text) {
                Some(raw) => Some(parse_count(source, 1, "death", &raw)?),
                None => {
                    warn!(state = %source.state, "正文中未找到死亡人数");
                    None
                }
            }
        };

        debug!(state = %source.state, infected, ?deaths, "正文抽取完成");

        Ok(Extraction {
            timestamp,
            observations: Vec::new(),
            published_total: Some(PublishedTotal { infected, deaths }),
        })
    }
}

fn compile_all(patterns: &[String]) -> ImportResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(ImportError::from))
        .collect()
}

/// 范围内全部正文段落拼接
fn scoped_text(scope: ElementRef<'_>, layout: &ProseConfig) -> ImportResult<String> {
    let selector = compile_selector(&layout.text_selector)?;
    Ok(scope
        .select(&selector)
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" "))
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn anchor_missing(source: &SourceConfig, layout: &ProseConfig) -> ImportError {
    ImportError::AnchorNotFound {
        state: source.state,
        anchor: layout.count_patterns.join(" | "),
    }
}

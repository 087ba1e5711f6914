// ==========================================
// 疫情通报采集系统 - 数据源配置对象
// ==========================================
// 每个联邦州一份配置: 锚点文本 / 时间格式候选 / 改写规则 / 抽取策略
// 通用管线只读取这里的数据，不含任何州专属控制流
// ==========================================

use crate::domain::types::{FederalState, ObservationKind, RegionKind};
use crate::importer::name_canonicalizer::RewriteRule;
use serde::{Deserialize, Serialize};

// ==========================================
// 时间戳锚点
// ==========================================

/// 年份来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearSource {
    InText,    // 文本自带年份
    Reference, // 文本无年份，使用运行参数中的参考年份
}

/// 一个候选日期时间格式
///
/// 格式串使用 chrono 语法，%B 匹配德文月份名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimePattern {
    pub format: String,
    pub default_hour: Option<u32>, // 仅日期的格式补齐小时
    pub year: YearSource,
}

impl DateTimePattern {
    /// 含日期与时间
    pub fn datetime(format: &str) -> Self {
        Self {
            format: format.to_string(),
            default_hour: None,
            year: YearSource::InText,
        }
    }

    /// 仅日期，补齐固定小时
    pub fn date_at(format: &str, hour: u32) -> Self {
        Self {
            format: format.to_string(),
            default_hour: Some(hour),
            year: YearSource::InText,
        }
    }

    /// 文本不含年份
    pub fn without_year(mut self) -> Self {
        self.year = YearSource::Reference;
        self
    }
}

/// 时间戳所在位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampAnchor {
    pub selector: String,          // CSS 选择器
    pub contains: Option<String>,  // 取第一个包含该文本的元素
    pub pick_last: bool,           // 取最后一个匹配元素
    pub capture: Option<String>,   // 正则，取第 1 个捕获组
    pub compact: bool,             // 去除全部空白后再匹配格式
    pub patterns: Vec<DateTimePattern>,
}

impl TimestampAnchor {
    pub fn new(selector: &str, patterns: Vec<DateTimePattern>) -> Self {
        Self {
            selector: selector.to_string(),
            contains: None,
            pick_last: false,
            capture: None,
            compact: false,
            patterns,
        }
    }

    pub fn containing(mut self, text: &str) -> Self {
        self.contains = Some(text.to_string());
        self
    }

    pub fn capture(mut self, regex: &str) -> Self {
        self.capture = Some(regex.to_string());
        self
    }

    pub fn last(mut self) -> Self {
        self.pick_last = true;
        self
    }

    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

// ==========================================
// 非数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SentinelMatch {
    Exact(String),
    Prefix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SentinelAction {
    Skip,                     // 跳过该行
    Stop,                     // 终止读取
    Total,                    // 来源合计行: 记录为权威合计，继续读取
    TotalAndStop,             // 表尾合计行: 记录为权威合计并终止
    Section(ObservationKind), // 分节标题: 切换后续行的层级
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentinel {
    pub matcher: SentinelMatch,
    pub action: SentinelAction,
}

impl Sentinel {
    pub fn exact(label: &str, action: SentinelAction) -> Self {
        Self {
            matcher: SentinelMatch::Exact(label.to_string()),
            action,
        }
    }

    pub fn prefix(label: &str, action: SentinelAction) -> Self {
        Self {
            matcher: SentinelMatch::Prefix(label.to_string()),
            action,
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        match &self.matcher {
            SentinelMatch::Exact(expected) => label == expected,
            SentinelMatch::Prefix(prefix) => label.starts_with(prefix.as_str()),
        }
    }
}

// ==========================================
// 抽取策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRef {
    Index(usize),
    Last,
}

impl ColumnRef {
    pub fn resolve(&self, len: usize) -> Option<usize> {
        match self {
            ColumnRef::Index(idx) if *idx < len => Some(*idx),
            ColumnRef::Last if len > 0 => Some(len - 1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelCell {
    Th,         // 行内第一个 th
    Td(usize),  // 第 n 个 td
}

/// 表头锚点（相对于表格）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderAnchor {
    pub selector: String,
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlTableConfig {
    pub table_selector: String,
    pub header: HeaderAnchor,
    pub row_selector: String,
    pub skip_rows: usize,
    pub label: LabelCell,
    pub expected_cells: Vec<usize>, // 空表示不校验
    pub count_column: ColumnRef,
    pub death_column: Option<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookConfig {
    pub infected_sheet: String,
    pub deaths_sheet: Option<String>,
    pub anchor_prefix: String, // 标签列中表头单元格的前缀
    pub label_column: usize,
    pub count_column: usize,
    pub date_column: usize, // 锚点下一行中日期所在列
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelimitedConfig {
    pub delimiter: u8,
    pub label_column: String,
    pub count_column: String,
    pub death_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProseConfig {
    pub item_selector: Option<String>, // 逐条目搜索（时间戳相对条目求值）
    pub text_selector: String,
    pub count_patterns: Vec<String>,   // 依次尝试，取首个匹配
    pub death_patterns: Vec<String>,   // 为空表示来源不提供死亡数
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractionStrategy {
    HtmlTable(HtmlTableConfig),
    Workbook(WorkbookConfig),
    Delimited(DelimitedConfig),
    Prose(ProseConfig),
}

impl ExtractionStrategy {
    pub fn family(&self) -> &'static str {
        match self {
            ExtractionStrategy::HtmlTable(_) => "html-table",
            ExtractionStrategy::Workbook(_) => "workbook",
            ExtractionStrategy::Delimited(_) => "delimited",
            ExtractionStrategy::Prose(_) => "prose",
        }
    }

    /// 是否需要附件文档（xlsx / csv）
    pub fn needs_attachment(&self) -> bool {
        matches!(
            self,
            ExtractionStrategy::Workbook(_) | ExtractionStrategy::Delimited(_)
        )
    }
}

// ==========================================
// 人口查找策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupOrder {
    CountyFirst,
    CityFirst,
}

/// 合并区域（人口为各组成部分之和）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRegion {
    pub label: String,
    pub parts: Vec<(RegionKind, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionResolution {
    pub lookup_order: LookupOrder,
    pub composites: Vec<CompositeRegion>,
}

impl Default for RegionResolution {
    fn default() -> Self {
        Self {
            lookup_order: LookupOrder::CountyFirst,
            composites: Vec::new(),
        }
    }
}

// ==========================================
// SourceConfig - 一个联邦州的完整配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub state: FederalState,
    pub url: Option<String>,            // 默认页面地址（需检索的来源为 None）
    pub attachment_url: Option<String>, // 默认附件地址
    pub timestamp: TimestampAnchor,
    pub strategy: ExtractionStrategy,
    pub sentinels: Vec<Sentinel>,
    pub placeholders: Vec<String>,      // 视为 0 的"无数据"标记
    pub default_kind: ObservationKind,
    pub rules: Vec<RewriteRule>,
    pub resolution: RegionResolution,
}

impl SourceConfig {
    /// 查找匹配行标签的非数据行规则
    pub fn sentinel_for(&self, label: &str) -> Option<SentinelAction> {
        self.sentinels
            .iter()
            .find(|s| s.matches(label))
            .map(|s| s.action)
    }

    pub fn is_placeholder(&self, value: &str) -> bool {
        self.placeholders.iter().any(|p| p == value)
    }

    /// 仅产出州级记录的来源
    pub fn is_state_only(&self) -> bool {
        matches!(self.strategy, ExtractionStrategy::Prose(_))
    }
}

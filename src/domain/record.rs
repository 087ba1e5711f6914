// ==========================================
// 疫情通报采集系统 - 记录实体
// ==========================================
// 流程: RawObservation → CanonicalRecord → 存储
// 红线: 同一次运行内所有记录共享同一个通报时间戳
// ==========================================

use crate::domain::types::{FederalState, Measurement, ObservationKind};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// 存储与日志中的时间格式（秒级精度，UTC）
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 格式化通报时间戳
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIME_FORMAT).to_string()
}

/// 解析存储中的时间戳
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT).map(|naive| naive.and_utc())
}

// ==========================================
// RawObservation - 抽取器输出的原始行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub state: FederalState,
    pub region_label: String,          // 来源原始标签
    pub region_kind: ObservationKind,  // 来源给出的层级
    pub infected: u64,                 // 累计确诊
    pub deaths: Option<u64>,           // 累计死亡（来源未提供时为 None）
    pub row_number: usize,             // 来源文档中的行号（1 起）
}

// ==========================================
// PublishedTotal - 来源自带的州级合计
// ==========================================
// 权威值：计算合计仅用于交叉校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedTotal {
    pub infected: u64,
    pub deaths: Option<u64>,
}

// ==========================================
// Extraction - 一次抽取的结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub timestamp: DateTime<Utc>,                // 通报截止时间
    pub observations: Vec<RawObservation>,       // 按文档顺序
    pub published_total: Option<PublishedTotal>, // 来源合计行 / 正文总数
}

// ==========================================
// CanonicalRecord - 存储单元
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordTags {
    pub state: String,          // 联邦州德文全称
    pub county: Option<String>, // 县/市规范名（州级记录为 None）
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFields {
    pub count: i64,
    pub p10k: Option<f64>,
    pub p100k: Option<f64>,
    pub death: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub measurement: Measurement,
    pub tags: RecordTags,
    pub timestamp: DateTime<Utc>,
    pub fields: RecordFields,
}

impl CanonicalRecord {
    /// 县/市级记录
    pub fn region(
        state: FederalState,
        county: impl Into<String>,
        timestamp: DateTime<Utc>,
        fields: RecordFields,
    ) -> Self {
        Self {
            measurement: Measurement::InfectedDeState,
            tags: RecordTags {
                state: state.name().to_string(),
                county: Some(county.into()),
            },
            timestamp,
            fields,
        }
    }

    /// 州级汇总记录
    pub fn state_total(state: FederalState, timestamp: DateTime<Utc>, fields: RecordFields) -> Self {
        Self {
            measurement: Measurement::InfectedDe,
            tags: RecordTags {
                state: state.name().to_string(),
                county: None,
            },
            timestamp,
            fields,
        }
    }

    pub fn time_str(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

// ==========================================
// Anomaly - 运行中发现的异常
// ==========================================
// 异常不中止运行：记录照常写入，并发送通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    UnresolvedPopulation, // 参考数据中找不到区域
    TotalMismatch,        // 来源合计与逐行求和不一致
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub region: Option<String>,
    pub message: String,
}

impl Anomaly {
    pub fn new(kind: AnomalyKind, region: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            region,
            message: message.into(),
        }
    }
}

// ==========================================
// IngestRun - 运行审计记录
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    DryRun,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::DryRun => "DRY_RUN",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn parse(raw: &str) -> RunStatus {
        match raw.trim() {
            "SUCCESS" => RunStatus::Success,
            "DRY_RUN" => RunStatus::DryRun,
            _ => RunStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRun {
    pub run_id: String,                              // UUID v4
    pub state: FederalState,
    pub bulletin_timestamp: Option<DateTime<Utc>>,   // 失败于抽取前时为 None
    pub record_count: usize,
    pub unresolved_count: usize,
    pub total_mismatch: bool,
    pub status: RunStatus,
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

// ==========================================
// IngestOutcome - 一次成功运行的结果
// ==========================================
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub run: IngestRun,
    pub records: Vec<CanonicalRecord>,
    pub anomalies: Vec<Anomaly>,
}

impl IngestOutcome {
    /// 州级汇总记录（每次运行恰好一条）
    pub fn state_record(&self) -> Option<&CanonicalRecord> {
        self.records
            .iter()
            .find(|r| r.measurement == Measurement::InfectedDe)
    }

    /// 按县/市规范名查找记录
    pub fn region_record(&self, county: &str) -> Option<&CanonicalRecord> {
        self.records
            .iter()
            .find(|r| r.tags.county.as_deref() == Some(county))
    }
}

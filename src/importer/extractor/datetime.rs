// ==========================================
// 疫情通报采集系统 - 德文通报时间解析
// ==========================================
// 德文月份名 → 数字；无年份格式补参考年份；仅日期格式补固定小时
// 解析结果按 UTC 标注，不做时区换算
// ==========================================

use crate::importer::source_config::{DateTimePattern, YearSource};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

const GERMAN_MONTHS: [(&str, &str); 13] = [
    ("Januar", "01"),
    ("Februar", "02"),
    ("März", "03"),
    ("Maerz", "03"),
    ("April", "04"),
    ("Mai", "05"),
    ("Juni", "06"),
    ("Juli", "07"),
    ("August", "08"),
    ("September", "09"),
    ("Oktober", "10"),
    ("November", "11"),
    ("Dezember", "12"),
];

/// 统一通报文本: NBSP 转空格、en-dash 转 '-'、去首尾空白
pub fn normalize_text(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .replace('\u{2013}', "-")
        .trim()
        .to_string()
}

fn replace_month_names(text: &str) -> String {
    GERMAN_MONTHS
        .iter()
        .fold(text.to_string(), |acc, (name, number)| acc.replace(name, number))
}

/// 依次尝试候选格式，返回首个成功的解析结果
///
/// # 参数
/// - text: 时间戳文本片段
/// - patterns: 候选格式（按顺序）
/// - reference_year: 文本无年份时使用的年份
pub fn parse_bulletin_time(
    text: &str,
    patterns: &[DateTimePattern],
    reference_year: i32,
) -> Option<DateTime<Utc>> {
    parse_with_year_source(text, patterns, reference_year).map(|(ts, _)| ts)
}

/// 以抓取时刻推断无年份时间戳的年份
///
/// 取抓取时刻所在年份；结果晚于抓取时刻一天以上时改用上一年
/// （1 月 1 日抓取 12 月 31 日的通报）
pub fn parse_bulletin_time_near(
    text: &str,
    patterns: &[DateTimePattern],
    fetched_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let (ts, year_source) = parse_with_year_source(text, patterns, fetched_at.year())?;
    if year_source == YearSource::Reference && ts > fetched_at + Duration::days(1) {
        return parse_bulletin_time(text, patterns, fetched_at.year() - 1);
    }
    Some(ts)
}

fn parse_with_year_source(
    text: &str,
    patterns: &[DateTimePattern],
    reference_year: i32,
) -> Option<(DateTime<Utc>, YearSource)> {
    let normalized = normalize_text(text);
    patterns.iter().find_map(|pattern| {
        parse_with_pattern(&normalized, pattern, reference_year)
            .map(|naive| (Utc.from_utc_datetime(&naive), pattern.year))
    })
}

fn parse_with_pattern(
    text: &str,
    pattern: &DateTimePattern,
    reference_year: i32,
) -> Option<NaiveDateTime> {
    let mut text = text.to_string();
    let mut format = pattern.format.clone();

    if format.contains("%B") {
        text = replace_month_names(&text);
        format = format.replace("%B", "%m");
    }

    if pattern.year == YearSource::Reference {
        text = format!("{} {}", reference_year, text);
        format = format!("%Y {}", format);
    }

    match pattern.default_hour {
        Some(hour) => NaiveDate::parse_from_str(&text, &format)
            .ok()?
            .and_hms_opt(hour, 0, 0),
        None => {
            // 仅有小时的格式补齐分钟
            if !format.contains("%M") {
                text.push_str(" 00");
                format.push_str(" %M");
            }
            NaiveDateTime::parse_from_str(&text, &format).ok()
        }
    }
}

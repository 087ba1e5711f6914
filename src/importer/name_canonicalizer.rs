// ==========================================
// 疫情通报采集系统 - 区域名规范化引擎
// ==========================================
// 职责: 按来源的有序改写规则，把原始标签映射为参考数据中的规范名
// 红线: 纯函数，不访问网络/存储/参考数据
// 红线: 规则链收敛后幂等 canonicalize(canonicalize(x)) == canonicalize(x)
// ==========================================

use crate::domain::region::CITY_SUFFIX;
use crate::domain::types::ObservationKind;
use serde::{Deserialize, Serialize};

// ==========================================
// RuleCondition - 规则触发条件
// ==========================================
// 按规则到达时的当前标签（已被前序规则改写）求值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleCondition {
    Always,
    StartsWith(String),
    Contains(String),
    ContainsIgnoreCase(String),
    NotContainsIgnoreCase(String),
    Equals(String),
    NotEquals(String),
    KindIs(ObservationKind),
    KindIsNot(ObservationKind),
    All(Vec<RuleCondition>),
}

impl RuleCondition {
    fn matches(&self, label: &str, kind: ObservationKind) -> bool {
        match self {
            RuleCondition::Always => true,
            RuleCondition::StartsWith(prefix) => label.starts_with(prefix.as_str()),
            RuleCondition::Contains(needle) => label.contains(needle.as_str()),
            RuleCondition::ContainsIgnoreCase(needle) => {
                label.to_lowercase().contains(&needle.to_lowercase())
            }
            RuleCondition::NotContainsIgnoreCase(needle) => {
                !label.to_lowercase().contains(&needle.to_lowercase())
            }
            RuleCondition::Equals(value) => label == value,
            RuleCondition::NotEquals(value) => label != value,
            RuleCondition::KindIs(expected) => kind == *expected,
            RuleCondition::KindIsNot(expected) => kind != *expected,
            RuleCondition::All(conditions) => conditions.iter().all(|c| c.matches(label, kind)),
        }
    }
}

// ==========================================
// RuleAction - 改写动作
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleAction {
    /// 子串替换；to 包含 from 且标签已含 to 时跳过
    Replace { from: String, to: String },
    /// 整体替换
    Exact { from: String, to: String },
    StripPrefix(String),
    StripSuffix(String),
    /// 删除全部出现
    Remove(String),
    /// 追加 " (Stadt)"（已存在时跳过）并标记为市
    AppendCitySuffix,
    SetKind(ObservationKind),
}

impl RuleAction {
    fn apply(&self, label: &mut String, kind: &mut ObservationKind) {
        match self {
            RuleAction::Replace { from, to } => {
                if to.contains(from.as_str()) && label.contains(to.as_str()) {
                    return;
                }
                if label.contains(from.as_str()) {
                    *label = label.replace(from.as_str(), to);
                }
            }
            RuleAction::Exact { from, to } => {
                if label == from {
                    *label = to.clone();
                }
            }
            RuleAction::StripPrefix(prefix) => {
                if let Some(rest) = label.strip_prefix(prefix.as_str()) {
                    *label = rest.to_string();
                }
            }
            RuleAction::StripSuffix(suffix) => {
                if let Some(rest) = label.strip_suffix(suffix.as_str()) {
                    *label = rest.to_string();
                }
            }
            RuleAction::Remove(fragment) => {
                if !fragment.is_empty() && label.contains(fragment.as_str()) {
                    *label = label.replace(fragment.as_str(), "");
                }
            }
            RuleAction::AppendCitySuffix => {
                if !label.ends_with(CITY_SUFFIX) {
                    label.push_str(CITY_SUFFIX);
                }
                *kind = ObservationKind::City;
            }
            RuleAction::SetKind(new_kind) => {
                *kind = *new_kind;
            }
        }
    }
}

// ==========================================
// RewriteRule - 条件 + 动作序列
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub condition: RuleCondition,
    pub actions: Vec<RuleAction>,
}

impl RewriteRule {
    pub fn when(condition: RuleCondition, actions: Vec<RuleAction>) -> Self {
        Self { condition, actions }
    }

    pub fn always(actions: Vec<RuleAction>) -> Self {
        Self::when(RuleCondition::Always, actions)
    }
}

// 规则构造辅助（供规则表使用）
pub fn replace(from: &str, to: &str) -> RuleAction {
    RuleAction::Replace {
        from: from.to_string(),
        to: to.to_string(),
    }
}

pub fn exact(from: &str, to: &str) -> RuleAction {
    RuleAction::Exact {
        from: from.to_string(),
        to: to.to_string(),
    }
}

pub fn strip_prefix(prefix: &str) -> RuleAction {
    RuleAction::StripPrefix(prefix.to_string())
}

pub fn remove(fragment: &str) -> RuleAction {
    RuleAction::Remove(fragment.to_string())
}

// ==========================================
// CanonicalName - 规范化结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalName {
    pub name: String,
    pub kind: ObservationKind,
}

// ==========================================
// NameCanonicalizer - 规则引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct NameCanonicalizer {
    rules: Vec<RewriteRule>,
}

impl NameCanonicalizer {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// 规范化原始标签
    ///
    /// # 参数
    /// - raw_label: 来源原始标签
    /// - kind: 抽取阶段给出的层级
    ///
    /// # 返回
    /// - CanonicalName: 规范名 + 最终层级（以 " (Stadt)" 结尾时为 City）
    pub fn canonicalize(&self, raw_label: &str, kind: ObservationKind) -> CanonicalName {
        let mut label = normalize_whitespace(raw_label);
        let mut kind = kind;

        for rule in &self.rules {
            if !rule.condition.matches(&label, kind) {
                continue;
            }
            for action in &rule.actions {
                action.apply(&mut label, &mut kind);
            }
        }

        let name = label.trim().to_string();
        if name.ends_with(CITY_SUFFIX) {
            kind = ObservationKind::City;
        }

        CanonicalName { name, kind }
    }

    /// 仅返回规范名（层级未知）
    pub fn canonicalize_label(&self, raw_label: &str) -> String {
        self.canonicalize(raw_label, ObservationKind::None).name
    }
}

/// 空白归一: NBSP 转空格、折叠连续空白、去首尾空白
pub fn normalize_whitespace(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rule_passes_through() {
        let engine = NameCanonicalizer::default();
        let result = engine.canonicalize("  Böblingen ", ObservationKind::None);
        assert_eq!(result.name, "Böblingen");
        assert_eq!(result.kind, ObservationKind::None);
    }

    #[test]
    fn test_rule_order_matters() {
        // 先剥离前缀再追加后缀
        let engine = NameCanonicalizer::new(vec![RewriteRule::when(
            RuleCondition::StartsWith("SK ".to_string()),
            vec![strip_prefix("SK "), RuleAction::AppendCitySuffix],
        )]);
        let result = engine.canonicalize("SK Magdeburg", ObservationKind::None);
        assert_eq!(result.name, "Magdeburg (Stadt)");
        assert_eq!(result.kind, ObservationKind::City);
    }

    #[test]
    fn test_replace_guard_keeps_chain_idempotent() {
        let engine = NameCanonicalizer::new(vec![RewriteRule::always(vec![replace(
            "Bad Tölz",
            "Bad Tölz-Wolfratshausen",
        )])]);

        let once = engine.canonicalize_label("Bad Tölz");
        assert_eq!(once, "Bad Tölz-Wolfratshausen");
        assert_eq!(engine.canonicalize_label(&once), once);
    }

    #[test]
    fn test_conditions_see_rewritten_label() {
        let engine = NameCanonicalizer::new(vec![
            RewriteRule::always(vec![remove("*")]),
            RewriteRule::when(
                RuleCondition::Equals("Köln".to_string()),
                vec![RuleAction::AppendCitySuffix],
            ),
        ]);
        assert_eq!(engine.canonicalize_label("Köln*"), "Köln (Stadt)");
    }

    #[test]
    fn test_city_suffix_sets_kind() {
        let engine = NameCanonicalizer::default();
        let result = engine.canonicalize("Stuttgart (Stadt)", ObservationKind::None);
        assert_eq!(result.kind, ObservationKind::City);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("Anhalt\u{a0} Bitterfeld\r\n "), "Anhalt Bitterfeld");
    }
}

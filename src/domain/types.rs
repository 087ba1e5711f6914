// ==========================================
// 疫情通报采集系统 - 领域类型定义
// ==========================================
// 联邦州 / 区域层级 / 指标名 / 人口基数
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 联邦州 (Federal State)
// ==========================================
// 序列化格式: 两位简称（BW / BY / ...），与人口参考数据的键一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FederalState {
    Bw, // Baden-Württemberg
    By, // Bayern
    Be, // Berlin
    Bb, // Brandenburg
    Hb, // Bremen
    Hh, // Hamburg
    He, // Hessen
    Mv, // Mecklenburg-Vorpommern
    Ni, // Niedersachsen
    Nw, // Nordrhein-Westfalen
    Rp, // Rheinland-Pfalz
    Sl, // Saarland
    Sn, // Sachsen
    St, // Sachsen-Anhalt
    Sh, // Schleswig-Holstein
    Th, // Thüringen
}

impl FederalState {
    /// 全部 16 个联邦州（固定顺序）
    pub const ALL: [FederalState; 16] = [
        FederalState::Bw,
        FederalState::By,
        FederalState::Be,
        FederalState::Bb,
        FederalState::Hb,
        FederalState::Hh,
        FederalState::He,
        FederalState::Mv,
        FederalState::Ni,
        FederalState::Nw,
        FederalState::Rp,
        FederalState::Sl,
        FederalState::Sn,
        FederalState::St,
        FederalState::Sh,
        FederalState::Th,
    ];

    /// 两位简称
    pub fn short(&self) -> &'static str {
        match self {
            FederalState::Bw => "BW",
            FederalState::By => "BY",
            FederalState::Be => "BE",
            FederalState::Bb => "BB",
            FederalState::Hb => "HB",
            FederalState::Hh => "HH",
            FederalState::He => "HE",
            FederalState::Mv => "MV",
            FederalState::Ni => "NI",
            FederalState::Nw => "NW",
            FederalState::Rp => "RP",
            FederalState::Sl => "SL",
            FederalState::Sn => "SN",
            FederalState::St => "ST",
            FederalState::Sh => "SH",
            FederalState::Th => "TH",
        }
    }

    /// 德文全称（写入存储时作为 state 标签值）
    pub fn name(&self) -> &'static str {
        match self {
            FederalState::Bw => "Baden-Württemberg",
            FederalState::By => "Bayern",
            FederalState::Be => "Berlin",
            FederalState::Bb => "Brandenburg",
            FederalState::Hb => "Bremen",
            FederalState::Hh => "Hamburg",
            FederalState::He => "Hessen",
            FederalState::Mv => "Mecklenburg-Vorpommern",
            FederalState::Ni => "Niedersachsen",
            FederalState::Nw => "Nordrhein-Westfalen",
            FederalState::Rp => "Rheinland-Pfalz",
            FederalState::Sl => "Saarland",
            FederalState::Sn => "Sachsen",
            FederalState::St => "Sachsen-Anhalt",
            FederalState::Sh => "Schleswig-Holstein",
            FederalState::Th => "Thüringen",
        }
    }

    /// 按德文全称反查
    pub fn from_name(name: &str) -> Option<FederalState> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for FederalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

impl FromStr for FederalState {
    type Err = String;

    /// 接受简称（大小写不敏感）或德文全称
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.short().eq_ignore_ascii_case(trimmed) || st.name() == trimmed)
            .ok_or_else(|| format!("未知联邦州: {}", s))
    }
}

// ==========================================
// 区域层级 (Region Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    State,  // 联邦州
    County, // 县 (Landkreis)
    City,   // 非县辖市 (kreisfreie Stadt)
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::State => "state",
            RegionKind::County => "county",
            RegionKind::City => "city",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "state" => Ok(RegionKind::State),
            "county" => Ok(RegionKind::County),
            "city" => Ok(RegionKind::City),
            other => Err(format!("未知区域层级: {}", other)),
        }
    }
}

// ==========================================
// 观测行层级 (Observation Kind)
// ==========================================
// 抽取阶段对行的初步判定；None 表示来源未区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    County,
    City,
    District,
    None,
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationKind::County => write!(f, "county"),
            ObservationKind::City => write!(f, "city"),
            ObservationKind::District => write!(f, "district"),
            ObservationKind::None => write!(f, "none"),
        }
    }
}

// ==========================================
// 指标名 (Measurement)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measurement {
    #[serde(rename = "infected_de_state")]
    InfectedDeState, // 县/市级
    #[serde(rename = "infected_de")]
    InfectedDe, // 州级汇总
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::InfectedDeState => "infected_de_state",
            Measurement::InfectedDe => "infected_de",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Measurement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infected_de_state" => Ok(Measurement::InfectedDeState),
            "infected_de" => Ok(Measurement::InfectedDe),
            other => Err(format!("未知指标名: {}", other)),
        }
    }
}

// ==========================================
// 人口基数 (Per-Population Factor)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerPopulation {
    TenThousand,
    HundredThousand,
}

impl PerPopulation {
    pub fn factor(&self) -> f64 {
        match self {
            PerPopulation::TenThousand => 10_000.0,
            PerPopulation::HundredThousand => 100_000.0,
        }
    }
}

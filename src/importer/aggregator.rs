// ==========================================
// 疫情通报采集系统 - 州级汇总
// ==========================================
// 按文档顺序累加县/市记录，最后产出一条州级合计
// 红线: 来源自带合计为权威值，逐行求和只用于交叉校验
// ==========================================

use crate::domain::record::PublishedTotal;
use crate::domain::types::FederalState;

/// 来源合计与逐行求和不一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalMismatch {
    pub published: u64,
    pub computed: u64,
}

/// 州级合计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTotal {
    pub count: u64,
    pub death: Option<u64>,
    pub computed_count: u64,
    pub regions: usize,
    pub mismatch: Option<TotalMismatch>,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    state: FederalState,
    count: u64,
    death: u64,
    has_death: bool,
    regions: usize,
}

impl Aggregator {
    pub fn new(state: FederalState) -> Self {
        Self {
            state,
            count: 0,
            death: 0,
            has_death: false,
            regions: 0,
        }
    }

    pub fn state(&self) -> FederalState {
        self.state
    }

    /// 累加一条县/市记录
    pub fn add(&mut self, count: u64, death: Option<u64>) {
        self.count += count;
        if let Some(d) = death {
            self.death += d;
            self.has_death = true;
        }
        self.regions += 1;
    }

    /// 当前逐行求和
    pub fn running_count(&self) -> u64 {
        self.count
    }

    /// 产出州级合计
    ///
    /// # 参数
    /// - published: 来源合计（合计行 / 正文总数）
    ///
    /// # 返回
    /// - StateTotal: 有来源合计时取来源值，并在存在分区记录且计数不一致时标记 mismatch
    pub fn finish(self, published: Option<PublishedTotal>) -> StateTotal {
        let computed_death = self.has_death.then_some(self.death);

        match published {
            Some(total) => {
                let mismatch = (self.regions > 0 && total.infected != self.count).then_some(
                    TotalMismatch {
                        published: total.infected,
                        computed: self.count,
                    },
                );
                StateTotal {
                    count: total.infected,
                    death: total.deaths.or(computed_death),
                    computed_count: self.count,
                    regions: self.regions,
                    mismatch,
                }
            }
            None => StateTotal {
                count: self.count,
                death: computed_death,
                computed_count: self.count,
                regions: self.regions,
                mismatch: None,
            },
        }
    }
}

mod iid_loss;
mod periodic_switching_link;
mod stochastic_switching_link;
mod trace_loss;

pub use iid_loss::IidLoss;
pub use periodic_switching_link::PeriodicSwitchingLink;
pub use stochastic_switching_link::StochasticSwitchingLink;
pub use trace_loss::{LossTrial, RESEED_AFTER_ACTIVATIONS, TraceLoss};

pub(crate) const MS_PER_SECOND: f64 = 1000.0;

// 单次停留时长上限，防止均值接近 0 时抽出天文数字
pub(crate) const MAX_SOJOURN_MS: u64 = 1 << 30;

pub(crate) fn bound(ms: f64) -> u64 {
    if ms > MAX_SOJOURN_MS as f64 {
        MAX_SOJOURN_MS
    } else {
        ms as u64
    }
}

// ==========================================
// LossQueue 用的丢包策略 (封闭集合，match 分发)
// ==========================================
#[derive(Debug)]
pub enum DropPolicy {
    Iid(IidLoss),
    Trace(TraceLoss),
    StochasticSwitching(StochasticSwitchingLink),
    PeriodicSwitching(PeriodicSwitchingLink),
}

impl DropPolicy {
    pub fn drop_packet(&mut self, now: u64) -> bool {
        match self {
            Self::Iid(p) => p.drop_packet(),
            Self::Trace(p) => p.drop_packet(now),
            Self::StochasticSwitching(p) => p.drop_packet(),
            Self::PeriodicSwitching(p) => p.drop_packet(),
        }
    }

    // 激活开关打开时调用
    pub fn on_activate(&mut self, now: u64) {
        if let Self::Trace(p) = self {
            p.on_activate(now);
        }
    }

    pub fn advance_to(&mut self, now: u64) {
        match self {
            Self::StochasticSwitching(p) => p.advance_to(now),
            Self::PeriodicSwitching(p) => p.advance_to(now),
            Self::Iid(_) | Self::Trace(_) => {}
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        match self {
            Self::StochasticSwitching(p) => Some(p.next_switch_time()),
            Self::PeriodicSwitching(p) => Some(p.next_switch_time()),
            Self::Iid(_) | Self::Trace(_) => None,
        }
    }
}

impl From<IidLoss> for DropPolicy {
    fn from(value: IidLoss) -> Self {
        Self::Iid(value)
    }
}

impl From<TraceLoss> for DropPolicy {
    fn from(value: TraceLoss) -> Self {
        Self::Trace(value)
    }
}

impl From<StochasticSwitchingLink> for DropPolicy {
    fn from(value: StochasticSwitchingLink) -> Self {
        Self::StochasticSwitching(value)
    }
}

impl From<PeriodicSwitchingLink> for DropPolicy {
    fn from(value: PeriodicSwitchingLink) -> Self {
        Self::PeriodicSwitching(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_caps_huge_sojourns() {
        assert_eq!(bound(12.9), 12);
        assert_eq!(bound(f64::INFINITY), MAX_SOJOURN_MS);
        assert_eq!(bound(1e12), MAX_SOJOURN_MS);
    }
}

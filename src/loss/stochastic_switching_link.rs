use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    loss::{MS_PER_SECOND, bound},
};

// ==========================================
// 指数分布开关链路：构造时 down 且立即到期，第一次 advance 切成 up
// ==========================================
#[derive(Debug)]
pub struct StochasticSwitchingLink {
    link_is_on: bool,
    // 上线时长的分布 (均值 mean_on_time)
    on_sojourn: Exp<f64>,
    // 下线时长的分布 (均值 mean_off_time)
    off_sojourn: Exp<f64>,
    next_switch_time: u64,
    rng: StdRng,
}

impl StochasticSwitchingLink {
    // 均值单位是秒
    pub fn new(mean_on_time: f64, mean_off_time: f64, rng: StdRng, now: u64) -> Result<Self> {
        let on_sojourn = sojourn_process("mean_on_time", mean_on_time)?;
        let off_sojourn = sojourn_process("mean_off_time", mean_off_time)?;
        if mean_on_time == 0.0 && mean_off_time == 0.0 {
            return Err(Error::ZeroPeriod);
        }

        debug!(mean_on_time, mean_off_time, "stochastic switching link configured");
        Ok(Self {
            link_is_on: false,
            on_sojourn,
            off_sojourn,
            next_switch_time: now,
            rng,
        })
    }

    pub fn link_is_on(&self) -> bool {
        self.link_is_on
    }

    pub fn next_switch_time(&self) -> u64 {
        self.next_switch_time
    }

    pub fn advance_to(&mut self, now: u64) {
        while self.next_switch_time <= now {
            self.link_is_on = !self.link_is_on;
            let process = if self.link_is_on {
                &self.on_sojourn
            } else {
                &self.off_sojourn
            };
            self.next_switch_time += bound(process.sample(&mut self.rng));
            trace!(on = self.link_is_on, until = self.next_switch_time, "link switched");
        }
    }

    pub fn drop_packet(&self) -> bool {
        !self.link_is_on
    }
}

fn sojourn_process(name: &'static str, mean_seconds: f64) -> Result<Exp<f64>> {
    let mean_ms = MS_PER_SECOND * mean_seconds;
    // 非零均值至少 1ms，否则抽样几乎全截成 0，advance 会原地打转
    if !mean_seconds.is_finite() || mean_seconds < 0.0 || (mean_ms > 0.0 && mean_ms < 1.0) {
        return Err(Error::InvalidDuration {
            name,
            value: mean_seconds,
        });
    }
    // 均值为 0 时 rate 为无穷大，抽样恒为 0
    Exp::new(1.0 / mean_ms).map_err(|_| Error::InvalidDuration {
        name,
        value: mean_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn link(on: f64, off: f64) -> StochasticSwitchingLink {
        StochasticSwitchingLink::new(on, off, StdRng::seed_from_u64(42), 0).unwrap()
    }

    #[test]
    fn starts_down_and_comes_up_on_first_advance() {
        let mut l = link(1_000.0, 1_000.0);
        assert!(l.drop_packet());
        l.advance_to(0);
        assert!(l.link_is_on());
        assert!(!l.drop_packet());
        assert!(l.next_switch_time() > 0);
    }

    #[test]
    fn advance_is_idempotent_for_fixed_now() {
        let mut l = link(0.5, 0.5);
        l.advance_to(10_000);
        let state = (l.link_is_on(), l.next_switch_time());
        l.advance_to(10_000);
        assert_eq!(state, (l.link_is_on(), l.next_switch_time()));
        assert!(l.next_switch_time() > 10_000);
    }

    #[test]
    fn zero_off_time_keeps_link_up() {
        let mut l = link(1.0, 0.0);
        for now in (0..100_000).step_by(997) {
            l.advance_to(now);
            assert!(l.link_is_on());
        }
    }

    #[test]
    fn long_run_availability_matches_means() {
        let mut l = link(0.3, 0.1);
        let mut up = 0u64;
        let total = 2_000_000u64;
        for now in 0..total / 10 {
            l.advance_to(now * 10);
            if l.link_is_on() {
                up += 1;
            }
        }
        let frac = up as f64 / (total / 10) as f64;
        assert!((frac - 0.75).abs() < 0.05, "availability = {frac}");
    }

    #[test]
    fn rejects_bad_parameters() {
        let rng = || StdRng::seed_from_u64(1);
        assert!(matches!(
            StochasticSwitchingLink::new(0.0, 0.0, rng(), 0),
            Err(Error::ZeroPeriod)
        ));
        assert!(StochasticSwitchingLink::new(-1.0, 1.0, rng(), 0).is_err());
        assert!(StochasticSwitchingLink::new(1.0, f64::NAN, rng(), 0).is_err());
    }

    #[test]
    fn rejects_sub_millisecond_means() {
        let rng = || StdRng::seed_from_u64(1);
        assert!(matches!(
            StochasticSwitchingLink::new(0.00001, 0.00001, rng(), 0),
            Err(Error::InvalidDuration { name: "mean_on_time", .. })
        ));
        assert!(matches!(
            StochasticSwitchingLink::new(1.0, 0.0005, rng(), 0),
            Err(Error::InvalidDuration { name: "mean_off_time", .. })
        ));

        // 1ms 是下限，能正常往前推
        let mut l = link(0.001, 0.001);
        l.advance_to(100_000);
        assert!(l.next_switch_time() > 100_000);
    }
}

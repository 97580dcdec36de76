use std::path::Path;
use std::str::FromStr;

use rand::{Rng, SeedableRng, distributions::Bernoulli, rngs::StdRng};
use rand_distr::Distribution;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    trace::{TraceCursor, TraceSchedule},
};

// 每激活这么多次就重置随机数种子，重放同一丢包序列
pub const RESEED_AFTER_ACTIVATIONS: u32 = 41;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossTrial {
    // 1..=100 均匀抽样，和整数百分比比较
    #[default]
    Percent,
    Bernoulli,
}

impl FromStr for LossTrial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "None" | "none" | "percent" => Ok(Self::Percent),
            "bernoulli" => Ok(Self::Bernoulli),
            other => Err(Error::UnknownLossTrial(other.to_string())),
        }
    }
}

#[derive(Debug)]
struct LossSchedule {
    schedule: TraceSchedule<f64>,
    percent: Vec<u32>,
    drop_dist: Vec<Bernoulli>,
}

impl LossSchedule {
    fn new(schedule: TraceSchedule<f64>) -> Result<Self> {
        let mut percent = Vec::with_capacity(schedule.len());
        let mut drop_dist = Vec::with_capacity(schedule.len());
        for &(_, rate) in schedule.entries() {
            percent.push((rate * 100.0).round() as u32);
            drop_dist.push(Bernoulli::new(rate).map_err(|_| Error::InvalidProbability(rate))?);
        }
        Ok(Self {
            schedule,
            percent,
            drop_dist,
        })
    }
}

// ==========================================
// 时变丢包：按 trace 回放丢包率
// ==========================================
#[derive(Debug)]
pub struct TraceLoss {
    // 方向没开时为 None，trace 文件都不读
    trace: Option<LossSchedule>,
    cursor: TraceCursor,
    trial: LossTrial,
    trial_seed: u64,
    trial_rng: StdRng,
    activations: u32,
}

impl TraceLoss {
    pub fn new(
        direction_enabled: bool,
        trace_file: impl AsRef<Path>,
        trial: LossTrial,
        trial_seed: u64,
        now: u64,
    ) -> Result<Self> {
        if !direction_enabled {
            return Ok(Self::build(None, trial, trial_seed, now));
        }
        Self::from_schedule(TraceSchedule::from_file(trace_file)?, trial, trial_seed, now)
    }

    pub fn from_schedule(
        schedule: TraceSchedule<f64>,
        trial: LossTrial,
        trial_seed: u64,
        now: u64,
    ) -> Result<Self> {
        debug!(
            source = schedule.source_name(),
            entries = schedule.len(),
            ?trial,
            "trace loss configured"
        );
        let trace = LossSchedule::new(schedule)?;
        Ok(Self::build(Some(trace), trial, trial_seed, now))
    }

    fn build(trace: Option<LossSchedule>, trial: LossTrial, trial_seed: u64, now: u64) -> Self {
        Self {
            trace,
            cursor: TraceCursor::new(now),
            trial,
            trial_seed,
            trial_rng: StdRng::seed_from_u64(trial_seed),
            activations: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.trace.is_some()
    }

    pub fn cursor(&self) -> &TraceCursor {
        &self.cursor
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }

    pub fn on_activate(&mut self, now: u64) {
        self.cursor.reset(now);
        self.activations += 1;
        if self.activations == RESEED_AFTER_ACTIVATIONS {
            info!(seed = self.trial_seed, "trace loss trial generator reseeded");
            self.trial_rng = StdRng::seed_from_u64(self.trial_seed);
            self.activations = 0;
        }
    }

    pub fn drop_packet(&mut self, now: u64) -> bool {
        let Some(trace) = &self.trace else {
            return false;
        };

        let index = self.cursor.advance(&trace.schedule, now);
        match self.trial {
            LossTrial::Percent => self.trial_rng.gen_range(1..=100) <= trace.percent[index],
            LossTrial::Bernoulli => trace.drop_dist[index].sample(&mut self.trial_rng),
        }
    }
}

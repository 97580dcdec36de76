use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    loss::{MS_PER_SECOND, bound},
};

// 固定周期开关链路：on_time 在线，off_time 掉线，循环往复
#[derive(Debug)]
pub struct PeriodicSwitchingLink {
    link_is_on: bool,
    on_time: u64,
    off_time: u64,
    next_switch_time: u64,
}

impl PeriodicSwitchingLink {
    // 单位是秒
    pub fn new(on_time: f64, off_time: f64, now: u64) -> Result<Self> {
        let on_ms = period_ms("on_time", on_time)?;
        let off_ms = period_ms("off_time", off_time)?;
        if on_ms == 0 && off_ms == 0 {
            return Err(Error::ZeroPeriod);
        }

        debug!(on_ms, off_ms, "periodic switching link configured");
        Ok(Self {
            link_is_on: false,
            on_time: on_ms,
            off_time: off_ms,
            next_switch_time: now,
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
            self.next_switch_time += if self.link_is_on {
                self.on_time
            } else {
                self.off_time
            };
            trace!(on = self.link_is_on, until = self.next_switch_time, "link switched");
        }
    }

    pub fn drop_packet(&self) -> bool {
        !self.link_is_on
    }
}

fn period_ms(name: &'static str, seconds: f64) -> Result<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::InvalidDuration {
            name,
            value: seconds,
        });
    }
    Ok(bound(MS_PER_SECOND * seconds))
}

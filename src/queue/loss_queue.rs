use std::collections::VecDeque;

use tracing::{info, trace};

use crate::{
    activation::Activation,
    clock::{Clock, MonotonicClock},
    loss::DropPolicy,
    queue::{LinkQueue, NO_DEADLINE, PacketSink, wait_until},
};

// ==========================================
// 丢包队列：不建模延迟，收下的包下一次 write 全部发走
// ==========================================

// 每个包先看激活开关：关着就原样放行，关→开的瞬间重启基于时间的策略
pub struct LossQueue<T, C = MonotonicClock> {
    queue: VecDeque<T>,
    policy: DropPolicy,
    activation: Activation,
    ready: bool,
    clock: C,
}

impl<T> LossQueue<T> {
    pub fn new(policy: impl Into<DropPolicy>, activation: Activation) -> Self {
        Self::with_clock(policy, activation, MonotonicClock)
    }
}

impl<T, C: Clock> LossQueue<T, C> {
    pub fn with_clock(policy: impl Into<DropPolicy>, activation: Activation, clock: C) -> Self {
        Self {
            queue: VecDeque::new(),
            policy: policy.into(),
            activation,
            ready: false,
            clock,
        }
    }

    pub fn policy(&self) -> &DropPolicy {
        &self.policy
    }

    pub fn is_active(&self) -> bool {
        self.ready
    }

    pub fn advance(&mut self) {
        let now = self.clock.now_ms();
        self.advance_to(now);
    }

    pub fn advance_to(&mut self, now: u64) {
        self.policy.advance_to(now);
    }

    fn check(&mut self, now: u64) -> bool {
        let active = self.activation.is_active();
        if active && !self.ready {
            info!("loss emulation activated");
            self.ready = true;
            self.policy.on_activate(now);
        } else if !active && self.ready {
            info!("loss emulation deactivated");
            self.ready = false;
        }
        active
    }
}

impl<T, C: Clock> LinkQueue<T> for LossQueue<T, C> {
    fn read_packet(&mut self, payload: T) -> Result<(), T> {
        let now = self.clock.now_ms();
        if self.check(now) && self.policy.drop_packet(now) {
            trace!(now, "packet dropped");
            return Err(payload);
        }
        self.queue.push_back(payload);
        Ok(())
    }

    fn write_packets(&mut self, sink: &mut dyn PacketSink<T>) {
        while let Some(payload) = self.queue.pop_front() {
            sink.write(payload);
        }
    }

    fn wait_time(&mut self) -> u16 {
        let now = self.clock.now_ms();
        self.advance_to(now);

        // 有包要发优先，不管链路状态何时切换
        if !self.queue.is_empty() {
            return 0;
        }
        match self.policy.next_deadline() {
            Some(at) => wait_until(at, now),
            None => NO_DEADLINE,
        }
    }

    fn pending_output(&self) -> bool {
        !self.queue.is_empty()
    }
}

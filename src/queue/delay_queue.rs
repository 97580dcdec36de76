use std::collections::VecDeque;

use crate::{
    clock::{Clock, MonotonicClock},
    pending_packet::PendingPacket,
    queue::{LinkQueue, NO_DEADLINE, PacketSink, wait_until},
};

// ==========================================
// 固定延迟 FIFO：延迟恒定，队头永远是最先到期的包
// ==========================================
pub struct DelayQueue<T, C = MonotonicClock> {
    queue: VecDeque<PendingPacket<T>>,
    delay_ms: u64,
    clock: C,
}

impl<T> DelayQueue<T> {
    pub fn new(delay_ms: u64) -> Self {
        Self::with_clock(delay_ms, MonotonicClock)
    }
}

impl<T, C: Clock> DelayQueue<T, C> {
    pub fn with_clock(delay_ms: u64, clock: C) -> Self {
        Self {
            queue: VecDeque::new(),
            delay_ms,
            clock,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T, C: Clock> LinkQueue<T> for DelayQueue<T, C> {
    fn read_packet(&mut self, payload: T) -> Result<(), T> {
        let release_at = self.clock.now_ms().saturating_add(self.delay_ms);
        self.queue.push_back(PendingPacket::new(release_at, payload));
        Ok(())
    }

    fn write_packets(&mut self, sink: &mut dyn PacketSink<T>) {
        let now = self.clock.now_ms();
        while self.queue.front().is_some_and(|pkt| pkt.is_due(now)) {
            if let Some(pkt) = self.queue.pop_front() {
                sink.write(pkt.payload);
            }
        }
    }

    fn wait_time(&mut self) -> u16 {
        match self.queue.front() {
            Some(pkt) => wait_until(pkt.release_at, self.clock.now_ms()),
            None => NO_DEADLINE,
        }
    }

    fn pending_output(&self) -> bool {
        !self.queue.is_empty()
    }
}

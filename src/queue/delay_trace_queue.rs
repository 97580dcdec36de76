use std::collections::VecDeque;
use std::path::Path;

use crate::{
    clock::{Clock, MonotonicClock},
    error,
    pending_packet::PendingPacket,
    queue::{LinkQueue, NO_DEADLINE, PacketSink, wait_until},
    trace::{TraceCursor, TraceSchedule},
};

// ==========================================
// Trace 驱动的延迟队列
// ==========================================

// 延迟会变小，到期的包可能排在没到期的包后面：write 扫全队列，
// wait_time 只看队头 (后面的包最多多等一轮 poll)
pub struct DelayTraceQueue<T, C = MonotonicClock> {
    schedule: TraceSchedule<u64>,
    cursor: TraceCursor,
    queue: VecDeque<PendingPacket<T>>,
    clock: C,
}

impl<T> DelayTraceQueue<T> {
    pub fn from_file(path: impl AsRef<Path>) -> error::Result<Self> {
        Ok(Self::new(TraceSchedule::from_file(path)?, MonotonicClock))
    }
}

impl<T, C: Clock> DelayTraceQueue<T, C> {
    pub fn new(schedule: TraceSchedule<u64>, clock: C) -> Self {
        let cursor = TraceCursor::new(clock.now_ms());
        Self {
            schedule,
            cursor,
            queue: VecDeque::new(),
            clock,
        }
    }

    pub fn cursor(&self) -> &TraceCursor {
        &self.cursor
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T, C: Clock> LinkQueue<T> for DelayTraceQueue<T, C> {
    fn read_packet(&mut self, payload: T) -> Result<(), T> {
        let now = self.clock.now_ms();
        let index = self.cursor.advance(&self.schedule, now);
        let delay_ms = self.schedule.value(index);
        self.queue
            .push_back(PendingPacket::new(now.saturating_add(delay_ms), payload));
        Ok(())
    }

    fn write_packets(&mut self, sink: &mut dyn PacketSink<T>) {
        let now = self.clock.now_ms();
        if !self.queue.iter().any(|pkt| pkt.is_due(now)) {
            return;
        }

        // 到期的发走，没到期的按原顺序留下
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for pkt in self.queue.drain(..) {
            if pkt.is_due(now) {
                sink.write(pkt.payload);
            } else {
                kept.push_back(pkt);
            }
        }
        self.queue = kept;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn queue(text: &str, clock: &ManualClock) -> DelayTraceQueue<&'static str, ManualClock> {
        let schedule = TraceSchedule::parse("trace", text).unwrap();
        DelayTraceQueue::new(schedule, clock.clone())
    }

    #[test]
    fn delay_follows_trace_and_wraps() {
        let clock = ManualClock::new(1_000);
        let mut q = queue("100,5\n300,20", &clock);

        clock.set(1_050);
        q.read_packet("a").unwrap();
        assert_eq!(q.wait_time(), 5);
        assert_eq!(q.cursor().index(), 0);

        clock.set(1_301);
        q.read_packet("b").unwrap();
        assert_eq!(q.cursor().index(), 0);
        assert_eq!(q.cursor().base_timestamp(), 1_301);

        let mut out = Vec::new();
        q.write_packets(&mut out);
        assert_eq!(out, vec!["a"]);
        assert_eq!(q.wait_time(), 5);
    }

    #[test]
    fn second_entry_applies_after_first_offset() {
        let clock = ManualClock::new(0);
        let mut q = queue("100,5\n300,20", &clock);
        clock.set(150);
        q.read_packet("x").unwrap();
        assert_eq!(q.wait_time(), 20);
    }

    #[test]
    fn releases_due_packets_behind_pending_front() {
        let clock = ManualClock::new(0);
        let mut q = queue("10,50\n1000,5", &clock);

        clock.set(5);
        q.read_packet("slow").unwrap(); // 5 + 50
        clock.set(20);
        q.read_packet("fast").unwrap(); // 20 + 5
        clock.set(21);
        q.read_packet("fast2").unwrap(); // 21 + 5

        clock.set(25);
        let mut out = Vec::new();
        q.write_packets(&mut out);
        assert_eq!(out, vec!["fast"]);

        // 只看队头
        assert_eq!(q.wait_time(), 30);

        clock.set(55);
        q.write_packets(&mut out);
        assert_eq!(out, vec!["fast", "slow", "fast2"]);
        assert_eq!(q.wait_time(), NO_DEADLINE);
    }

    #[test]
    fn huge_trace_delay_saturates_instead_of_overflowing() {
        let clock = ManualClock::new(10);
        let mut q = queue("100,18446744073709551615", &clock);
        q.read_packet("forever").unwrap();
        assert_eq!(q.wait_time(), NO_DEADLINE);

        let mut out = Vec::new();
        clock.set(1_000_000);
        q.write_packets(&mut out);
        assert!(out.is_empty());

        let mut q = queue("100,1e30", &clock);
        q.read_packet("float").unwrap();
        assert_eq!(q.wait_time(), NO_DEADLINE);
    }

    #[test]
    fn missing_file_fails_construction() {
        assert!(DelayTraceQueue::<Vec<u8>>::from_file("/nonexistent/delay.trace").is_err());
    }
}

use std::collections::VecDeque;

mod delay_queue;
mod delay_trace_queue;
mod loss_queue;
mod monitor_queue;

pub use delay_queue::DelayQueue;
pub use delay_trace_queue::DelayTraceQueue;
pub use loss_queue::LossQueue;
pub use monitor_queue::MonitorQueue;

// wait_time 的哨兵值：没有截止时间
pub const NO_DEADLINE: u16 = u16::MAX;

pub fn saturate_wait(ms: u64) -> u16 {
    u16::try_from(ms).unwrap_or(NO_DEADLINE)
}

// 已到期返回 0
pub(crate) fn wait_until(release_at: u64, now: u64) -> u16 {
    saturate_wait(release_at.saturating_sub(now))
}

// 出口：真实场景是 nfqueue verdict，测试里就是 Vec
pub trait PacketSink<T> {
    fn write(&mut self, payload: T);
}

impl<T> PacketSink<T> for Vec<T> {
    fn write(&mut self, payload: T) {
        self.push(payload);
    }
}

impl<T> PacketSink<T> for VecDeque<T> {
    fn write(&mut self, payload: T) {
        self.push_back(payload);
    }
}

// 链路模拟器和事件循环之间的约定
pub trait LinkQueue<T> {
    // Err: 被丢掉的包原样还给调用方
    fn read_packet(&mut self, payload: T) -> Result<(), T>;
    fn write_packets(&mut self, sink: &mut dyn PacketSink<T>);
    fn wait_time(&mut self) -> u16;
    fn pending_output(&self) -> bool;
    fn finished(&self) -> bool {
        false
    }
}

impl<T, Q: LinkQueue<T> + ?Sized> LinkQueue<T> for Box<Q> {
    fn read_packet(&mut self, payload: T) -> Result<(), T> {
        (**self).read_packet(payload)
    }

    fn write_packets(&mut self, sink: &mut dyn PacketSink<T>) {
        (**self).write_packets(sink)
    }

    fn wait_time(&mut self) -> u16 {
        (**self).wait_time()
    }

    fn pending_output(&self) -> bool {
        (**self).pending_output()
    }

    fn finished(&self) -> bool {
        (**self).finished()
    }
}

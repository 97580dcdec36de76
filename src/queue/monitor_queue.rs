use chrono::Local;
use std::time::{Duration, Instant};
use tracing::info;

use crate::queue::{LinkQueue, PacketSink};

// ==========================================
// 1. 统计表 (每秒速率 + 积压水位)
// ==========================================
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    // 每秒清零
    pub in_pkts: u64,
    pub drop_pkts: u64,
    pub out_pkts: u64,
    pub out_bytes: u64,

    // 积压水位，永不清零
    pub backlog_pkts: u64,
}

// 包一层 sink，顺手数出队的包和字节
struct CountingSink<'a, T> {
    inner: &'a mut dyn PacketSink<T>,
    pkts: u64,
    bytes: u64,
}

impl<T: AsRef<[u8]>> PacketSink<T> for CountingSink<'_, T> {
    fn write(&mut self, payload: T) {
        self.pkts += 1;
        self.bytes += payload.as_ref().len() as u64;
        self.inner.write(payload);
    }
}

// ==========================================
// 2. 监控外壳：透传所有调用，每秒打一次报表
// ==========================================
pub struct MonitorQueue<T> {
    name: String,
    pub inner: Box<dyn LinkQueue<T>>,
    stats: QueueStats,
    report_interval: Duration,
    last_report: Instant,
}

impl<T> MonitorQueue<T> {
    pub fn new(name: &str, inner: Box<dyn LinkQueue<T>>) -> Self {
        Self {
            name: name.to_string(),
            inner,
            stats: QueueStats::default(),
            report_interval: Duration::from_secs(1),
            last_report: Instant::now(),
        }
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    fn check_and_report(&mut self) {
        let elapsed = self.last_report.elapsed();
        if elapsed < self.report_interval {
            return;
        }

        let mbps = (self.stats.out_bytes as f64 * 8.0) / 1_000_000.0 / elapsed.as_secs_f64();
        info!(
            queue = %self.name,
            at = %Local::now().format("%H:%M:%S"),
            in_pkts = self.stats.in_pkts,
            drop_pkts = self.stats.drop_pkts,
            out_pkts = self.stats.out_pkts,
            mbps = %format!("{mbps:.2}"),
            backlog_pkts = self.stats.backlog_pkts,
            "link report"
        );

        // 只清每秒的增量，保留积压
        self.stats = QueueStats {
            backlog_pkts: self.stats.backlog_pkts,
            ..QueueStats::default()
        };
        self.last_report = Instant::now();
    }
}

impl<T: AsRef<[u8]>> LinkQueue<T> for MonitorQueue<T> {
    fn read_packet(&mut self, payload: T) -> Result<(), T> {
        let result = self.inner.read_packet(payload);
        match result {
            Ok(()) => {
                self.stats.in_pkts += 1;
                self.stats.backlog_pkts += 1;
            }
            Err(_) => self.stats.drop_pkts += 1,
        }
        self.check_and_report();
        result
    }

    fn write_packets(&mut self, sink: &mut dyn PacketSink<T>) {
        let mut counting = CountingSink {
            inner: sink,
            pkts: 0,
            bytes: 0,
        };
        self.inner.write_packets(&mut counting);

        let (pkts, bytes) = (counting.pkts, counting.bytes);
        self.stats.out_pkts += pkts;
        self.stats.out_bytes += bytes;
        self.stats.backlog_pkts = self.stats.backlog_pkts.saturating_sub(pkts);
        self.check_and_report();
    }

    fn wait_time(&mut self) -> u16 {
        self.inner.wait_time()
    }

    fn pending_output(&self) -> bool {
        self.inner.pending_output()
    }

    fn finished(&self) -> bool {
        self.inner.finished()
    }
}

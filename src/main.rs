use std::error::Error;
use std::io;
use std::time::Duration;

use clap::Parser;
use nfq::Queue;
use tracing::info;
use tracing_subscriber::EnvFilter;

use link_emu::{
    config::{Cli, Command, Direction},
    hairpin,
    nfq_message::{NfqMessage, NfqSink},
    queue::{LinkQueue, MonitorQueue, NO_DEADLINE},
};

const QUEUE_MAX_LEN: u32 = 10000;
const BATCH_LIMIT: usize = 10000;
// 空闲时最多睡这么久，nfqueue 是非阻塞的，睡太久会积压
const MAX_IDLE_SLEEP: Duration = Duration::from_micros(100);

fn make_queue(queue_num: u16) -> Result<Queue, io::Error> {
    let mut q = Queue::open()?;
    q.bind(queue_num)?;
    q.set_copy_range(queue_num, 0xFFFF)?;
    q.set_queue_max_len(queue_num, QUEUE_MAX_LEN)?;
    q.set_nonblocking(true);
    Ok(q)
}

// 有到期的包就别睡
fn idle_sleep(wait_ms: u16) -> Option<Duration> {
    (wait_ms > 0).then(|| MAX_IDLE_SLEEP.min(Duration::from_millis(u64::from(wait_ms))))
}

// 一个方向：一条 nfqueue + 一个链路模拟器
struct Lane {
    queue: Queue,
    link: MonitorQueue<NfqMessage>,
}

impl Lane {
    // 返回是否收到了包
    fn drain_arrivals(&mut self) -> bool {
        let mut received = false;
        for _ in 0..BATCH_LIMIT {
            let Ok(msg) = self.queue.recv() else {
                break;
            };
            received = true;
            if let Err(dropped) = self.link.read_packet(NfqMessage::from(msg)) {
                dropped.drop_on(&mut self.queue);
            }
        }
        received
    }

    // 返回是否真的放出了包
    fn flush(&mut self) -> bool {
        if !self.link.pending_output() {
            return false;
        }
        let backlog = self.link.stats().backlog_pkts;
        self.link.write_packets(&mut NfqSink {
            queue: &mut self.queue,
        });
        self.link.stats().backlog_pkts != backlog
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::PrepareTrace {
            input_file,
            output_dir,
        } => {
            hairpin::prepare_traces(input_file, output_dir)?;
            return Ok(());
        }
        Command::SelectTrace {
            input_dir,
            threshold,
        } => {
            for path in hairpin::select_traces(input_dir, *threshold)? {
                println!("{}", path.display());
            }
            return Ok(());
        }
        _ => {}
    }

    let mut lanes = Vec::new();
    for (direction, queue_num, name) in [
        (Direction::Uplink, cli.uplink_queue, "uplink"),
        (Direction::Downlink, cli.downlink_queue, "downlink"),
    ] {
        let Some(link) = cli.build_link::<NfqMessage>(direction)? else {
            return Ok(());
        };
        let link = MonitorQueue::new(name, link)
            .with_report_interval(Duration::from_secs(cli.report_interval_secs));
        lanes.push(Lane {
            queue: make_queue(queue_num)?,
            link,
        });
        info!(queue_num, name, "lane ready");
    }

    loop {
        let mut working = false;

        // 1. 收包
        for lane in &mut lanes {
            working |= lane.drain_arrivals();
        }

        // 2. 发包 (到期的才会真正放出去)
        for lane in &mut lanes {
            working |= lane.flush();
        }

        // 3. 空闲就睡，但不越过最近的截止时间
        if !working {
            let wait_ms = lanes
                .iter_mut()
                .map(|lane| lane.link.wait_time())
                .min()
                .unwrap_or(NO_DEADLINE);
            if let Some(nap) = idle_sleep(wait_ms) {
                std::thread::sleep(nap);
            }
        }
    }
}

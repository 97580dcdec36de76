use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    activation::Activation,
    clock::{Clock, MonotonicClock},
    error::Result,
    hairpin::DEFAULT_SELECT_THRESHOLD,
    loss::{IidLoss, LossTrial, PeriodicSwitchingLink, StochasticSwitchingLink, TraceLoss},
    queue::{DelayQueue, DelayTraceQueue, LinkQueue, LossQueue},
    trace::TraceSchedule,
};

#[derive(Debug, Parser)]
#[command(name = "link_emu", version, about = "Delay and loss emulation on netfilter queues")]
pub struct Cli {
    /// nfqueue number carrying uplink packets
    #[arg(long, default_value_t = 0)]
    pub uplink_queue: u16,

    /// nfqueue number carrying downlink packets
    #[arg(long, default_value_t = 1)]
    pub downlink_queue: u16,

    /// Loss is only applied while this file exists
    #[arg(long)]
    pub activation_file: Option<PathBuf>,

    /// Seed for loss generators (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds between link reports
    #[arg(long, default_value_t = 1)]
    pub report_interval_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Uplink,
    Downlink,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fixed one-way delay
    Delay { delay_ms: u64 },
    /// Delay replayed from a `timestamp,delay` trace
    DelayTrace {
        #[arg(long)]
        trace_file: PathBuf,
    },
    /// Independent random loss
    IidLoss { loss_rate: f64 },
    /// Loss rate replayed from a `timestamp,rate` trace on one direction
    TraceLoss {
        link: Direction,
        #[arg(long)]
        trace_file: PathBuf,
        /// `None`/`percent` or `bernoulli`
        #[arg(long, default_value = "None")]
        loss_type: String,
        #[arg(long, default_value_t = 0)]
        trial_seed: u64,
    },
    /// Link with exponentially distributed on/off periods (seconds)
    StochasticLink { mean_on_time: f64, mean_off_time: f64 },
    /// Link with fixed on/off periods (seconds)
    PeriodicLink { on_time: f64, off_time: f64 },
    /// Turn a hairpin measurement file into rtt and loss traces
    PrepareTrace {
        #[arg(long)]
        input_file: PathBuf,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List hairpin measurement files with enough lossy records
    SelectTrace {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SELECT_THRESHOLD)]
        threshold: usize,
    },
}

impl Cli {
    pub fn activation(&self) -> Activation {
        match &self.activation_file {
            Some(path) => Activation::marker_file(path),
            None => Activation::Always,
        }
    }

    // 上下行各用一条独立的随机流
    fn rng(&self, direction: Direction) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(direction as u64)),
            None => StdRng::from_entropy(),
        }
    }

    // 不模拟链路的子命令返回 None
    pub fn build_link<T: 'static>(&self, direction: Direction) -> Result<Option<Box<dyn LinkQueue<T>>>> {
        let now = MonotonicClock.now_ms();
        let link: Box<dyn LinkQueue<T>> = match &self.command {
            Command::Delay { delay_ms } => Box::new(DelayQueue::new(*delay_ms)),
            Command::DelayTrace { trace_file } => Box::new(DelayTraceQueue::new(
                TraceSchedule::from_file(trace_file)?,
                MonotonicClock,
            )),
            Command::IidLoss { loss_rate } => Box::new(LossQueue::new(
                IidLoss::new(*loss_rate, self.rng(direction))?,
                self.activation(),
            )),
            Command::TraceLoss {
                link,
                trace_file,
                loss_type,
                trial_seed,
            } => {
                let trial: LossTrial = loss_type.parse()?;
                let policy = TraceLoss::new(*link == direction, trace_file, trial, *trial_seed, now)?;
                Box::new(LossQueue::new(policy, self.activation()))
            }
            Command::StochasticLink {
                mean_on_time,
                mean_off_time,
            } => Box::new(LossQueue::new(
                StochasticSwitchingLink::new(*mean_on_time, *mean_off_time, self.rng(direction), now)?,
                self.activation(),
            )),
            Command::PeriodicLink { on_time, off_time } => Box::new(LossQueue::new(
                PeriodicSwitchingLink::new(*on_time, *off_time, now)?,
                self.activation(),
            )),
            Command::PrepareTrace { .. } | Command::SelectTrace { .. } => return Ok(None),
        };
        Ok(Some(link))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::Error;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("link_emu").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_global_options() {
        let c = cli(&["--uplink-queue", "4", "--seed", "9", "delay", "25"]);
        assert_eq!(c.uplink_queue, 4);
        assert_eq!(c.downlink_queue, 1);
        assert_eq!(c.seed, Some(9));
        assert!(matches!(c.command, Command::Delay { delay_ms: 25 }));
    }

    #[test]
    fn builds_delay_link() {
        let c = cli(&["delay", "25"]);
        let mut link = c.build_link::<Vec<u8>>(Direction::Uplink).unwrap().unwrap();
        link.read_packet(vec![1]).unwrap();
        assert!(link.pending_output());
        assert!(link.wait_time() <= 25);
    }

    #[test]
    fn trace_loss_only_reads_trace_for_selected_direction() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("loss.trace");
        fs::write(&trace, "1000,1\n").unwrap();
        let trace = trace.to_str().unwrap();

        let c = cli(&["--seed", "1", "trace-loss", "uplink", "--trace-file", trace]);
        let mut up = c.build_link::<u32>(Direction::Uplink).unwrap().unwrap();
        let mut down = c.build_link::<u32>(Direction::Downlink).unwrap().unwrap();
        assert_eq!(up.read_packet(1), Err(1));
        assert_eq!(down.read_packet(2), Ok(()));

        let missing = cli(&["trace-loss", "downlink", "--trace-file", "/nonexistent/loss"]);
        assert!(missing.build_link::<u32>(Direction::Uplink).is_ok());
        assert!(missing.build_link::<u32>(Direction::Downlink).is_err());
    }

    #[test]
    fn rejects_unknown_loss_type() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("loss.trace");
        fs::write(&trace, "1000,0.5\n").unwrap();
        let c = cli(&[
            "trace-loss",
            "uplink",
            "--trace-file",
            trace.to_str().unwrap(),
            "--loss-type",
            "gilbert",
        ]);
        assert!(matches!(
            c.build_link::<u32>(Direction::Uplink),
            Err(Error::UnknownLossTrial(_))
        ));
    }

    #[test]
    fn periodic_link_with_zero_period_fails() {
        let c = cli(&["periodic-link", "0", "0"]);
        assert!(matches!(
            c.build_link::<u32>(Direction::Uplink),
            Err(Error::ZeroPeriod)
        ));
    }

    #[test]
    fn prepare_trace_builds_no_link() {
        let c = cli(&["prepare-trace", "--input-file", "hp.txt"]);
        assert!(c.build_link::<u32>(Direction::Uplink).unwrap().is_none());
    }

    #[test]
    fn select_trace_defaults_threshold() {
        let c = cli(&["select-trace", "--input-dir", "/data/hairpin"]);
        match &c.command {
            Command::SelectTrace {
                input_dir,
                threshold,
            } => {
                assert_eq!(input_dir, &PathBuf::from("/data/hairpin"));
                assert_eq!(*threshold, 1000);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(c.build_link::<u32>(Direction::Downlink).unwrap().is_none());

        let c = cli(&["select-trace", "--input-dir", "d", "--threshold", "5"]);
        assert!(matches!(c.command, Command::SelectTrace { threshold: 5, .. }));
    }
}

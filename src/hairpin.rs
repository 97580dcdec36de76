use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

// ==========================================
// hairpin 测量记录 -> 延迟/丢包 trace
// 每行 `<带宽> <rtt> <丢包率>`，字段可带单位 (`12.5Mbps 40ms 0.01`)
// ==========================================
pub const STEP_MS: u64 = 30;
pub const DEFAULT_SELECT_THRESHOLD: usize = 1000;
const TRACE_KINDS: [&str; 3] = ["eth", "cell", "wifi"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HairpinRecord {
    pub bandwidth: f64,
    pub rtt: f64,
    pub loss_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTraces {
    pub rtt_trace: PathBuf,
    pub loss_trace: PathBuf,
}

fn strip_units(field: &str) -> String {
    field.chars().filter(|c| !c.is_ascii_alphabetic()).collect()
}

// 负丢包率是测量空洞，跳过
pub fn parse_records(source_name: &str, text: &str) -> Result<Vec<HairpinRecord>> {
    let mut records = Vec::new();
    for line in text.lines() {
        let invalid = || Error::InvalidLine {
            source_name: source_name.to_string(),
            line: line.to_string(),
        };

        let fields: Vec<f64> = line
            .split(' ')
            .take(3)
            .map(|f| strip_units(f).trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid())?;
        let [bandwidth, rtt, loss_rate] = fields[..] else {
            return Err(invalid());
        };

        if loss_rate < 0.0 {
            continue;
        }
        records.push(HairpinRecord {
            bandwidth,
            rtt,
            loss_rate,
        });
    }

    if records.is_empty() {
        return Err(Error::NoData {
            source_name: source_name.to_string(),
        });
    }
    Ok(records)
}

fn render(records: &[HairpinRecord], value: impl Fn(&HairpinRecord) -> f64) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| format!("{},{}\n", (i as u64 + 1) * STEP_MS, value(record)))
        .collect()
}

pub fn rtt_trace(records: &[HairpinRecord]) -> String {
    render(records, |r| r.rtt)
}

pub fn loss_trace(records: &[HairpinRecord]) -> String {
    render(records, |r| r.loss_rate)
}

// 输出 rtt_trace_<name> 和 lossrate_trace_<name>
pub fn prepare_traces(input: &Path, output_dir: &Path) -> Result<PreparedTraces> {
    let source_name = input.display().to_string();
    let text = fs::read_to_string(input).map_err(|source| Error::Open {
        source_name: source_name.clone(),
        source,
    })?;
    let records = parse_records(&source_name, &text)?;

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    let prepared = PreparedTraces {
        rtt_trace: output_dir.join(format!("rtt_trace_{name}")),
        loss_trace: output_dir.join(format!("lossrate_trace_{name}")),
    };

    fs::write(&prepared.rtt_trace, rtt_trace(&records))?;
    fs::write(&prepared.loss_trace, loss_trace(&records))?;
    info!(
        records = records.len(),
        rtt = %prepared.rtt_trace.display(),
        loss = %prepared.loss_trace.display(),
        "traces prepared"
    );
    Ok(prepared)
}

// 正丢包率的记录数，过了 threshold 就不用再数
fn lossy_records(text: &str, threshold: usize) -> usize {
    text.lines()
        .filter_map(|line| line.split(' ').nth(2))
        .filter(|field| strip_units(field).trim().parse::<f64>().is_ok_and(|rate| rate > 0.0))
        .take(threshold.saturating_add(1))
        .count()
}

/// Lists the eth/cell/wifi measurement files in `input_dir` that carry more
/// than `threshold` lossy records, sorted by path.
pub fn select_traces(input_dir: &Path, threshold: usize) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(input_dir).map_err(|source| Error::Open {
        source_name: input_dir.display().to_string(),
        source,
    })?;

    let mut selected = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_candidate = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|name| TRACE_KINDS.iter().any(|kind| name.contains(kind)));
        if !is_candidate || !path.is_file() {
            continue;
        }

        let text = fs::read_to_string(&path).map_err(|source| Error::Open {
            source_name: path.display().to_string(),
            source,
        })?;
        if lossy_records(&text, threshold) > threshold {
            info!(trace = %path.display(), "trace selected");
            selected.push(path);
        }
    }
    selected.sort();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceSchedule;

    #[test]
    fn strips_units_and_skips_negative_loss() {
        let text = "12.5Mbps 40ms 0.01\n3Mbps 55.5ms -1\n8Mbps 41ms 0.2\n";
        let records = parse_records("hp", text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].bandwidth, 12.5);
        assert_eq!(records[1].rtt, 41.0);
        assert_eq!(loss_trace(&records), "30,0.01\n60,0.2\n");
        assert_eq!(rtt_trace(&records), "30,40\n60,41\n");
    }

    #[test]
    fn short_record_is_invalid() {
        assert!(matches!(
            parse_records("hp", "12 40"),
            Err(Error::InvalidLine { .. })
        ));
    }

    #[test]
    fn prepared_files_load_as_traces() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cell_1");
        fs::write(&input, "10Mbps 45.5ms 0.05\n10Mbps 50ms 0\n").unwrap();

        let prepared = prepare_traces(&input, dir.path()).unwrap();
        assert!(prepared.rtt_trace.ends_with("rtt_trace_cell_1"));

        let delay = TraceSchedule::<u64>::from_file(&prepared.rtt_trace).unwrap();
        assert_eq!(delay.entries(), &[(30, 45), (60, 50)]);
        let loss = TraceSchedule::<f64>::from_file(&prepared.loss_trace).unwrap();
        assert_eq!(loss.entries(), &[(30, 0.05), (60, 0.0)]);
    }

    #[test]
    fn render_writes_one_line_per_record() {
        let records = parse_records("hp", "1 10 0\n1 20.5 0\n1 30 0.5\n").unwrap();
        assert_eq!(rtt_trace(&records), "30,10\n60,20.5\n90,30\n");
        assert_eq!(loss_trace(&records).lines().count(), 3);
    }

    #[test]
    fn selects_lossy_link_traces() {
        let dir = tempfile::tempdir().unwrap();
        let lossy = "10Mbps 40ms 0.1\n".repeat(4);
        let clean = "10Mbps 40ms 0\n".repeat(10);
        fs::write(dir.path().join("wifi_b"), &lossy).unwrap();
        fs::write(dir.path().join("cell_a"), format!("{clean}{lossy}")).unwrap();
        fs::write(dir.path().join("eth_quiet"), &clean).unwrap();
        fs::write(dir.path().join("eth_short"), "10Mbps 40ms 0.1\n".repeat(3)).unwrap();
        fs::write(dir.path().join("notes"), &lossy).unwrap();
        fs::create_dir(dir.path().join("eth_dir")).unwrap();

        let selected = select_traces(dir.path(), 3).unwrap();
        let names: Vec<_> = selected
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cell_a", "wifi_b"]);
    }

    #[test]
    fn missing_trace_dir_fails() {
        assert!(matches!(
            select_traces(Path::new("/nonexistent/hairpin"), DEFAULT_SELECT_THRESHOLD),
            Err(Error::Open { .. })
        ));
    }
}

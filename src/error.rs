use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// 构造期错误：全部是致命的，队列对象根本不会被创建
#[derive(Debug, Error)]
pub enum Error {
    #[error("{source_name}: error opening for reading")]
    Open {
        source_name: String,
        #[source]
        source: io::Error,
    },
    #[error("{source_name}: invalid empty line (line {line_no})")]
    EmptyLine { source_name: String, line_no: usize },
    #[error("{source_name}: invalid line: {line}")]
    InvalidLine { source_name: String, line: String },
    #[error("{source_name}: no valid trace data found")]
    NoData { source_name: String },
    #[error("invalid probability (must be in [0, 1]): {0}")]
    InvalidProbability(f64),
    #[error("invalid {name}: {value}")]
    InvalidDuration { name: &'static str, value: f64 },
    #[error("on_time and off_time cannot both be zero")]
    ZeroPeriod,
    #[error("unknown loss type: {0}")]
    UnknownLossTrial(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

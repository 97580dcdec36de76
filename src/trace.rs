use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

// ==========================================
// 1. Trace 值类型 (右列)
// ==========================================

// trace 行的右列
pub trait TraceValue: Sized + Copy {
    fn parse_field(field: &str) -> Option<Self>;
}

// 延迟 (ms)。转换脚本会写出 "45.0"，截断成整数毫秒
impl TraceValue for u64 {
    fn parse_field(field: &str) -> Option<Self> {
        if let Ok(ms) = field.parse::<u64>() {
            return Some(ms);
        }
        let ms = field.parse::<f64>().ok()?;
        if ms.is_finite() && ms >= 0.0 {
            Some(ms as u64)
        } else {
            None
        }
    }
}

// 丢包概率，必须落在 [0, 1]
impl TraceValue for f64 {
    fn parse_field(field: &str) -> Option<Self> {
        let p = field.parse::<f64>().ok()?;
        if (0.0..=1.0).contains(&p) { Some(p) } else { None }
    }
}

// ==========================================
// 2. 调度表：`offset_ms,value`，构造后不可变
// ==========================================

#[derive(Debug, Clone)]
pub struct TraceSchedule<V> {
    source_name: String,
    entries: Vec<(u64, V)>,
}

impl<V: TraceValue> TraceSchedule<V> {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| Error::Open {
            source_name: source_name.clone(),
            source,
        })?;
        Self::parse(&source_name, &text)
    }

    pub fn parse(source_name: &str, text: &str) -> Result<Self> {
        let invalid = |line: &str| Error::InvalidLine {
            source_name: source_name.to_string(),
            line: line.to_string(),
        };

        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() {
                return Err(Error::EmptyLine {
                    source_name: source_name.to_string(),
                    line_no: idx + 1,
                });
            }

            let (offset, value) = line.split_once(',').ok_or_else(|| invalid(line))?;
            if value.contains(',') {
                return Err(invalid(line));
            }

            let offset = offset.trim().parse::<u64>().map_err(|_| invalid(line))?;
            let value = V::parse_field(value.trim()).ok_or_else(|| invalid(line))?;
            entries.push((offset, value));
        }

        if entries.is_empty() {
            return Err(Error::NoData {
                source_name: source_name.to_string(),
            });
        }

        debug!(source = source_name, entries = entries.len(), "trace loaded");
        Ok(Self {
            source_name: source_name.to_string(),
            entries,
        })
    }
}

impl<V: Copy> TraceSchedule<V> {
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offset(&self, index: usize) -> u64 {
        self.entries[index].0
    }

    pub fn value(&self, index: usize) -> V {
        self.entries[index].1
    }

    pub fn entries(&self) -> &[(u64, V)] {
        &self.entries
    }
}

// ==========================================
// 3. 回放游标：循环重放有限 trace
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceCursor {
    base_timestamp: u64,
    next_index: usize,
}

impl TraceCursor {
    pub fn new(now: u64) -> Self {
        Self {
            base_timestamp: now,
            next_index: 0,
        }
    }

    pub fn reset(&mut self, now: u64) {
        self.base_timestamp = now;
        self.next_index = 0;
    }

    pub fn base_timestamp(&self) -> u64 {
        self.base_timestamp
    }

    pub fn index(&self) -> usize {
        self.next_index
    }

    // 走过最后一条就从 now 开新一轮
    pub fn advance<V: Copy>(&mut self, schedule: &TraceSchedule<V>, now: u64) -> usize {
        loop {
            let elapsed = now.saturating_sub(self.base_timestamp);
            if elapsed <= schedule.offset(self.next_index) {
                return self.next_index;
            }
            self.next_index = (self.next_index + 1) % schedule.len();
            if self.next_index == 0 {
                self.base_timestamp = now;
            }
        }
    }
}

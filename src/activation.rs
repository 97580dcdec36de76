use std::fmt;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

// 丢包模拟的外部开关，每个包采样一次
pub enum Activation {
    Always,
    Flag(Arc<AtomicBool>),
    Predicate(Box<dyn Fn() -> bool + Send>),
    // 文件存在即激活
    MarkerFile(PathBuf),
}

impl Activation {
    pub fn flag(flag: Arc<AtomicBool>) -> Self {
        Self::Flag(flag)
    }

    pub fn predicate(f: impl Fn() -> bool + Send + 'static) -> Self {
        Self::Predicate(Box::new(f))
    }

    pub fn marker_file(path: impl Into<PathBuf>) -> Self {
        Self::MarkerFile(path.into())
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Flag(flag) => flag.load(Ordering::Acquire),
            Self::Predicate(f) => f(),
            Self::MarkerFile(path) => path.exists(),
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::Always
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Flag(flag) => write!(f, "Flag({})", flag.load(Ordering::Relaxed)),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
            Self::MarkerFile(path) => write!(f, "MarkerFile({})", path.display()),
        }
    }
}

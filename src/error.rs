use std::time::Duration;
use thiserror::Error;

/// Failures reading from an audio source. All of them are transient: the
/// producer skips the cycle and tries again next period.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("audio read timed out after {0:?}")]
    Timeout(Duration),
    #[error("audio source returned no samples")]
    Empty,
    #[error("audio source I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a producer cycle that did not publish a snapshot.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("source reported {actual} samples for a {expected}-sample block")]
    BlockOverrun { expected: usize, actual: usize },
    #[error("cycle panicked: {0}")]
    Panicked(String),
}

impl CycleError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CycleError::Source(_))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{section}.median_len must be odd and >= 1 (got {value})")]
    MedianLength { section: &'static str, value: usize },
    #[error("{section}.smoothing must be within [0, 1] (got {value})")]
    Smoothing { section: &'static str, value: f32 },
    #[error("{section}.magnitude_threshold must be >= 0 (got {value})")]
    Threshold { section: &'static str, value: f32 },
    #[error("{section}: need 1 <= min_matches <= history_bits <= 64 (got {min_matches} of {history_bits})")]
    History {
        section: &'static str,
        history_bits: u32,
        min_matches: u32,
    },
    #[error("{section}.gate decay rate must be within [0, 1] (got {value})")]
    GateDecay { section: &'static str, value: f32 },
    #[error("short window must be at least 8 samples (got {0})")]
    ShortWindow(usize),
    #[error("long window ({long}) must be a multiple of the short window ({short})")]
    LongWindow { short: usize, long: usize },
    #[error("sample rate must be positive")]
    SampleRate,
    #[error("period_ms must be positive")]
    Period,
    #[error("read_timeout_ms must be positive")]
    ReadTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryParams {
    /// Number of recent votes remembered, at most 64.
    pub width: u32,
    /// Votes among the last `width` needed to report a detection.
    pub min_matches: u32,
    pub target_hz: f32,
    pub tolerance_hz: f32,
}

/// Recent votes for one window, newest in the least-significant bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryState {
    bits: u64,
}

impl HistoryState {
    #[cfg(test)]
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn matches(&self) -> u32 {
        self.bits.count_ones()
    }
}

/// Debounces a smoothed frequency stream into a boolean with a sliding
/// majority vote.
#[derive(Debug, Clone, Copy)]
pub struct HistoryVotingDetector {
    params: HistoryParams,
    mask: u64,
}

impl HistoryVotingDetector {
    pub fn new(params: HistoryParams) -> Self {
        let mask = if params.width >= 64 {
            u64::MAX
        } else {
            (1u64 << params.width) - 1
        };
        Self { params, mask }
    }

    pub fn is_match(&self, smoothed_hz: f32) -> bool {
        (smoothed_hz - self.params.target_hz).abs() <= self.params.tolerance_hz
    }

    pub fn observe(&self, state: &mut HistoryState, smoothed_hz: f32) -> bool {
        state.bits = (state.bits << 1) & self.mask;
        if self.is_match(smoothed_hz) {
            state.bits |= 1;
        }
        state.matches() >= self.params.min_matches
    }
}

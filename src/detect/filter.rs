use serde::Deserialize;

use super::ring::RingBuffer;

/// What happens to the smoothed value when a peak is gated out.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Keep the smoothed value as it is.
    Hold,
    /// Pull the smoothed value toward zero by this fraction per gated frame.
    Decay(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Odd number of accepted frequencies the median is taken over.
    pub median_len: usize,
    /// EMA weight of the newest median, in [0, 1].
    pub smoothing: f32,
    /// Peaks weaker than this never reach the median history.
    pub magnitude_threshold: f32,
    pub gate: GatePolicy,
}

/// Per-window filter memory, owned by the producer.
#[derive(Debug, Clone)]
pub struct FilterState {
    history: RingBuffer<f32>,
    ema: f32,
    seeded: bool,
    scratch: Vec<f32>,
}

impl FilterState {
    pub fn new(params: &FilterParams) -> Self {
        Self {
            history: RingBuffer::new(params.median_len),
            ema: 0.0,
            seeded: false,
            scratch: Vec::with_capacity(params.median_len),
        }
    }

    #[cfg(test)]
    pub fn filled(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    pub fn accepted(&self) -> impl Iterator<Item = &f32> {
        self.history.iter()
    }

    #[cfg(test)]
    pub fn smoothed(&self) -> f32 {
        self.ema
    }

    fn median(&mut self) -> f32 {
        if self.history.is_empty() {
            return self.ema;
        }
        self.scratch.clear();
        self.scratch.extend_from_slice(self.history.as_slice());
        self.scratch
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        self.scratch[self.scratch.len() / 2]
    }
}

/// Gated median + exponential smoothing over raw peak frequencies.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePeakFilter {
    params: FilterParams,
}

impl AdaptivePeakFilter {
    pub fn new(params: FilterParams) -> Self {
        Self { params }
    }

    /// Feed one raw estimate, returning the smoothed frequency.
    pub fn accept(&self, state: &mut FilterState, raw_hz: f32, raw_magnitude: f32) -> f32 {
        let alpha = self.params.smoothing;

        if raw_magnitude < self.params.magnitude_threshold {
            state.ema = match self.params.gate {
                GatePolicy::Hold => state.ema * (1.0 - alpha) + state.ema * alpha,
                GatePolicy::Decay(rate) => state.ema * (1.0 - rate),
            };
            return state.ema;
        }

        state.history.push(raw_hz);
        let median = state.median();

        if state.seeded {
            state.ema = alpha * median + (1.0 - alpha) * state.ema;
        } else {
            // First accepted value seeds the average instead of being pulled toward zero.
            state.ema = median;
            state.seeded = true;
        }
        state.ema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(median_len: usize, smoothing: f32) -> FilterParams {
        FilterParams {
            median_len,
            smoothing,
            magnitude_threshold: 1.0,
            gate: GatePolicy::Hold,
        }
    }

    #[test]
    fn converges_to_repeated_value() {
        let p = params(5, 0.3);
        let filter = AdaptivePeakFilter::new(p);
        let mut state = FilterState::new(&p);
        let mut out = 0.0;
        for _ in 0..5 {
            out = filter.accept(&mut state, 3100.0, 10.0);
        }
        assert_eq!(state.median(), 3100.0);
        assert!((out - 3100.0).abs() < 1e-3);
        let again = filter.accept(&mut state, 3100.0, 10.0);
        assert!((again - out).abs() < 1e-3);
    }

    #[test]
    fn first_sample_seeds_average() {
        let p = params(3, 0.1);
        let filter = AdaptivePeakFilter::new(p);
        let mut state = FilterState::new(&p);
        assert_eq!(filter.accept(&mut state, 1500.0, 5.0), 1500.0);
    }

    #[test]
    fn gated_samples_leave_history_untouched() {
        let p = params(5, 0.3);
        let filter = AdaptivePeakFilter::new(p);
        let mut state = FilterState::new(&p);
        filter.accept(&mut state, 3000.0, 5.0);
        filter.accept(&mut state, 3050.0, 5.0);
        let before: Vec<f32> = state.accepted().copied().collect();
        let filled = state.filled();
        let ema = state.smoothed();

        for _ in 0..20 {
            let out = filter.accept(&mut state, 9000.0, 0.5);
            assert!((out - ema).abs() < 1e-3);
        }

        assert_eq!(state.accepted().copied().collect::<Vec<_>>(), before);
        assert_eq!(state.filled(), filled);
    }

    #[test]
    fn decay_policy_pulls_toward_zero() {
        let p = FilterParams {
            gate: GatePolicy::Decay(0.5),
            ..params(3, 0.3)
        };
        let filter = AdaptivePeakFilter::new(p);
        let mut state = FilterState::new(&p);
        filter.accept(&mut state, 1000.0, 5.0);
        assert_eq!(filter.accept(&mut state, 0.0, 0.0), 500.0);
        assert_eq!(filter.accept(&mut state, 0.0, 0.0), 250.0);
        assert_eq!(state.filled(), 1);
    }

    #[test]
    fn median_rejects_single_outlier() {
        let p = params(3, 1.0);
        let filter = AdaptivePeakFilter::new(p);
        let mut state = FilterState::new(&p);
        filter.accept(&mut state, 3100.0, 5.0);
        filter.accept(&mut state, 3102.0, 5.0);
        let out = filter.accept(&mut state, 8000.0, 5.0);
        assert_eq!(out, 3102.0);
    }

    #[test]
    fn oldest_value_is_overwritten() {
        let p = params(3, 1.0);
        let filter = AdaptivePeakFilter::new(p);
        let mut state = FilterState::new(&p);
        for hz in [100.0, 200.0, 300.0, 400.0] {
            filter.accept(&mut state, hz, 5.0);
        }
        assert_eq!(
            state.accepted().copied().collect::<Vec<_>>(),
            vec![200.0, 300.0, 400.0]
        );
        assert_eq!(state.smoothed(), 300.0);
    }
}

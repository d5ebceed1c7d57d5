use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::source::{sample_to_f32, AudioSource};
use crate::config::{Config, DetectorConfig, WindowConfig};
use crate::detect::filter::{AdaptivePeakFilter, FilterState};
use crate::detect::fusion::fuse;
use crate::detect::history::{HistoryState, HistoryVotingDetector};
use crate::detect::window::{WindowAccumulator, WindowStatus};
use crate::error::{CycleError, SourceError};
use crate::metrics::{MetricsChannel, MetricsSnapshot, ProducerStats};
use crate::pacer::Pacer;
use crate::spectrum::peak::{self, RawPeak};
use crate::spectrum::transform::{apply_window, hann_window, FftTransform, SpectralTransform};

/// Result of running one window through the detection chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowOutcome {
    pub raw: RawPeak,
    pub smoothed_hz: f32,
    pub fired: bool,
}

/// Transform, filter and vote for one analysis window, with its state.
pub struct WindowPipeline {
    name: &'static str,
    hann: Vec<f32>,
    windowed: Vec<f32>,
    transform: Box<dyn SpectralTransform>,
    filter: AdaptivePeakFilter,
    filter_state: FilterState,
    detector: HistoryVotingDetector,
    history: HistoryState,
}

impl WindowPipeline {
    pub fn new(name: &'static str, window: &WindowConfig, detector: &DetectorConfig) -> Self {
        Self::with_transform(name, window, detector, Box::new(FftTransform::new(window.window)))
    }

    pub fn with_transform(
        name: &'static str,
        window: &WindowConfig,
        detector: &DetectorConfig,
        transform: Box<dyn SpectralTransform>,
    ) -> Self {
        let filter_params = window.filter_params();
        let size = transform.len();
        Self {
            name,
            hann: hann_window(size),
            windowed: Vec::with_capacity(size),
            transform,
            filter: AdaptivePeakFilter::new(filter_params),
            filter_state: FilterState::new(&filter_params),
            detector: HistoryVotingDetector::new(window.history_params(detector)),
            history: HistoryState::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.hann.len()
    }

    #[cfg(test)]
    pub fn history(&self) -> &HistoryState {
        &self.history
    }

    pub fn process(&mut self, samples: &[f32], sample_rate: f32) -> WindowOutcome {
        apply_window(samples, &self.hann, &mut self.windowed);
        let frame = self.transform.transform(&self.windowed);
        let raw = peak::estimate(&frame, sample_rate);
        let smoothed_hz = self
            .filter
            .accept(&mut self.filter_state, raw.frequency_hz, raw.magnitude);
        let fired = self.detector.observe(&mut self.history, smoothed_hz);
        WindowOutcome {
            raw,
            smoothed_hz,
            fired,
        }
    }
}

/// What a completed cycle produced.
#[derive(Clone, Copy, Debug)]
pub struct CycleReport {
    pub snapshot: MetricsSnapshot,
    pub short: WindowOutcome,
    pub long: Option<WindowOutcome>,
}

/// Reads one block per period, runs both windows and publishes the fused
/// result.
pub struct Producer<S> {
    source: S,
    read_timeout: Duration,
    sample_rate: f32,
    raw_block: Vec<i32>,
    block: Vec<f32>,
    short: WindowPipeline,
    long: WindowPipeline,
    accumulator: WindowAccumulator,
    last_long: (f32, bool),
    channel: MetricsChannel,
    stats: Arc<ProducerStats>,
}

impl<S: AudioSource> Producer<S> {
    pub fn new(source: S, config: &Config, channel: MetricsChannel, stats: Arc<ProducerStats>) -> Self {
        let short = WindowPipeline::new("short", &config.short, &config.detector);
        let long = WindowPipeline::new("long", &config.long, &config.detector);
        Self::with_pipelines(source, config, short, long, channel, stats)
    }

    pub fn with_pipelines(
        source: S,
        config: &Config,
        short: WindowPipeline,
        long: WindowPipeline,
        channel: MetricsChannel,
        stats: Arc<ProducerStats>,
    ) -> Self {
        let block_len = short.size();
        Self {
            source,
            read_timeout: config.audio.read_timeout(),
            sample_rate: config.audio.sample_rate as f32,
            raw_block: vec![0; block_len],
            block: Vec::with_capacity(block_len),
            accumulator: WindowAccumulator::new(long.size()),
            short,
            long,
            last_long: (0.0, false),
            channel,
            stats,
        }
    }

    #[cfg(test)]
    pub fn accumulator(&self) -> &WindowAccumulator {
        &self.accumulator
    }

    /// Reads, analyses and publishes one block.
    pub fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let read = self.source.read(&mut self.raw_block, self.read_timeout)?;
        if started.elapsed() > self.read_timeout {
            return Err(SourceError::Timeout(self.read_timeout).into());
        }
        if read == 0 {
            return Err(SourceError::Empty.into());
        }
        if read > self.raw_block.len() {
            return Err(CycleError::BlockOverrun {
                expected: self.raw_block.len(),
                actual: read,
            });
        }

        self.block.clear();
        self.block
            .extend(self.raw_block[..read].iter().map(|&s| sample_to_f32(s)));

        let sample_rate = self.sample_rate;
        let short = self.short.process(&self.block, sample_rate);

        let long = match self.accumulator.push(&self.block) {
            WindowStatus::Ready => {
                let pipeline = &mut self.long;
                self.accumulator.drain(|window| pipeline.process(window, sample_rate))
            }
            WindowStatus::Filling => None,
        };
        if let Some(outcome) = long {
            log::debug!(
                "{} window: raw {:.1} Hz ({:.2}), smoothed {:.1} Hz, fired={}, {} samples dropped so far",
                self.long.name(),
                outcome.raw.frequency_hz,
                outcome.raw.magnitude,
                outcome.smoothed_hz,
                outcome.fired,
                self.accumulator.dropped()
            );
            self.last_long = (outcome.smoothed_hz, outcome.fired);
        }

        let (peak_hz_long, fire_long) = self.last_long;
        let snapshot = MetricsSnapshot {
            peak_hz_short: short.smoothed_hz,
            peak_hz_long,
            fire_short: short.fired,
            fire_long,
            fire_overall: fuse(short.fired, fire_long),
        };
        self.channel.publish(snapshot);

        Ok(CycleReport {
            snapshot,
            short,
            long,
        })
    }

    /// Runs one cycle behind the fault boundary. Faults and skipped reads are
    /// logged and counted; neither stops the producer.
    pub fn step(&mut self) -> Option<CycleReport> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle()))
            .unwrap_or_else(|payload| Err(CycleError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(report) => {
                self.stats.record_cycle(report.long.is_some());
                log::trace!(
                    "short window: raw {:.1} Hz ({:.2}); published {:?}",
                    report.short.raw.frequency_hz,
                    report.short.raw.magnitude,
                    report.snapshot
                );
                Some(report)
            }
            Err(e) if e.is_transient() => {
                let skipped = self.stats.record_skipped_read();
                if skipped == 1 || skipped % 100 == 0 {
                    log::warn!("Skipping cycle: {} ({} skipped so far)", e, skipped);
                } else {
                    log::debug!("Skipping cycle: {}", e);
                }
                None
            }
            Err(e) => {
                let streak = self.stats.record_fault();
                log::error!("Producer cycle failed: {}", e);
                if streak > 1 && streak.is_power_of_two() {
                    log::warn!("{} consecutive producer cycles have failed", streak);
                }
                None
            }
        }
    }

    /// Cycles forever at the pacer's period.
    pub fn run(mut self, mut pacer: Pacer) {
        log::info!(
            "Producer running: {}-sample blocks every {:?}, long window {} samples",
            self.short.size(),
            pacer.period(),
            self.accumulator.capacity()
        );
        loop {
            pacer.wait();
            self.step();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

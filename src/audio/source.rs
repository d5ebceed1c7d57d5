use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use super::decode::decode_file;
use crate::error::SourceError;

/// Samples carry 24-bit audio left-justified in an `i32`.
pub const SAMPLE_SHIFT: u32 = 8;
const FULL_SCALE: f32 = 8_388_608.0;

pub fn sample_to_f32(sample: i32) -> f32 {
    (sample >> SAMPLE_SHIFT) as f32 / FULL_SCALE
}

pub fn f32_to_sample(value: f32) -> i32 {
    ((value.clamp(-1.0, 1.0) * (FULL_SCALE - 1.0)) as i32) << SAMPLE_SHIFT
}

/// A mono stream of encoded samples at a fixed rate.
pub trait AudioSource: Send {
    fn sample_rate(&self) -> u32;

    /// Fills up to `buf.len()` samples, waiting at most `timeout`.
    fn read(&mut self, buf: &mut [i32], timeout: Duration) -> Result<usize, SourceError>;
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read(&mut self, buf: &mut [i32], timeout: Duration) -> Result<usize, SourceError> {
        (**self).read(buf, timeout)
    }
}

/// Phase-continuous sine, optionally keyed on and off.
pub struct ToneSource {
    sample_rate: u32,
    frequency_hz: f64,
    amplitude: f32,
    on_samples: u64,
    off_samples: u64,
    phase: f64,
    position: u64,
}

impl ToneSource {
    pub fn new(sample_rate: u32, frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            sample_rate,
            frequency_hz: frequency_hz as f64,
            amplitude,
            on_samples: 0,
            off_samples: 0,
            phase: 0.0,
            position: 0,
        }
    }

    /// Sounds for `on` then stays silent for `off`, repeating.
    pub fn keyed(mut self, on: Duration, off: Duration) -> Self {
        let rate = self.sample_rate as f64;
        self.on_samples = (on.as_secs_f64() * rate) as u64;
        self.off_samples = (off.as_secs_f64() * rate) as u64;
        self
    }

    fn sounding(&self) -> bool {
        let cycle = self.on_samples + self.off_samples;
        self.off_samples == 0 || cycle == 0 || self.position % cycle < self.on_samples
    }
}

impl AudioSource for ToneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, buf: &mut [i32], _timeout: Duration) -> Result<usize, SourceError> {
        let step = std::f64::consts::TAU * self.frequency_hz / self.sample_rate as f64;
        for slot in buf.iter_mut() {
            let value = if self.sounding() {
                self.amplitude * self.phase.sin() as f32
            } else {
                0.0
            };
            *slot = f32_to_sample(value);
            self.phase = (self.phase + step) % std::f64::consts::TAU;
            self.position += 1;
        }
        Ok(buf.len())
    }
}

/// Serves a decoded audio file block by block.
pub struct FileSource {
    samples: Vec<i32>,
    sample_rate: u32,
    position: usize,
    looping: bool,
}

impl FileSource {
    pub fn open(path: &Path, looping: bool) -> Result<Self> {
        let decoded = decode_file(path)?;
        Ok(Self::from_samples(
            decoded.samples.iter().map(|&s| f32_to_sample(s)).collect(),
            decoded.sample_rate,
            looping,
        ))
    }

    pub fn from_samples(samples: Vec<i32>, sample_rate: u32, looping: bool) -> Self {
        Self {
            samples,
            sample_rate,
            position: 0,
            looping,
        }
    }
}

impl AudioSource for FileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, buf: &mut [i32], _timeout: Duration) -> Result<usize, SourceError> {
        if self.position >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return Err(SourceError::Empty);
            }
            log::debug!("input exhausted, rewinding");
            self.position = 0;
        }
        let n = buf.len().min(self.samples.len() - self.position);
        buf[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

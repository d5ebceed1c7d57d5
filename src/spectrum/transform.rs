use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Frequency-domain result of one analysis window, indexed by bin.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralFrame {
    pub re: Vec<f32>,
    pub im: Vec<f32>,
}

impl SpectralFrame {
    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn magnitude(&self, bin: usize) -> f32 {
        (self.re[bin] * self.re[bin] + self.im[bin] * self.im[bin]).sqrt()
    }
}

/// Turns `len()` windowed real samples into a spectral frame of the same
/// length.
pub trait SpectralTransform: Send {
    fn len(&self) -> usize;
    fn transform(&mut self, windowed: &[f32]) -> SpectralFrame;
}

/// Forward FFT, planned once for a fixed size.
pub struct FftTransform {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        }
    }
}

impl SpectralTransform for FftTransform {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn transform(&mut self, windowed: &[f32]) -> SpectralFrame {
        // Short input is zero-padded, long input truncated.
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(windowed.get(i).copied().unwrap_or(0.0), 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        SpectralFrame {
            re: self.buffer.iter().map(|c| c.re).collect(),
            im: self.buffer.iter().map(|c| c.im).collect(),
        }
    }
}

pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

/// Multiplies `samples` by `window`, zero-padding to the window length.
pub fn apply_window(samples: &[f32], window: &[f32], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        window
            .iter()
            .enumerate()
            .map(|(i, &w)| samples.get(i).copied().unwrap_or(0.0) * w),
    );
}

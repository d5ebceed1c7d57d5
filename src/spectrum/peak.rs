use super::transform::SpectralFrame;

/// Unsmoothed peak estimate for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawPeak {
    pub frequency_hz: f32,
    pub magnitude: f32,
}

const FLAT_DENOMINATOR: f32 = 1e-12;

/// Locates the strongest bin, excluding DC and the top edge, and refines
/// it with a parabola fitted through the log magnitudes of its neighbours.
///
/// A peak sitting on either end of the scan range, or with a non-positive
/// magnitude in its neighbourhood, is returned at the bin centre.
pub fn estimate(frame: &SpectralFrame, sample_rate: f32) -> RawPeak {
    let n = frame.len();
    let first = 1;
    let last = match (n / 2).checked_sub(2) {
        Some(last) if last >= first => last,
        _ => return RawPeak::default(),
    };
    let bin_hz = sample_rate / n as f32;

    let mut index = first;
    let mut peak = frame.magnitude(first);
    for bin in first + 1..=last {
        let mag = frame.magnitude(bin);
        if mag > peak {
            peak = mag;
            index = bin;
        }
    }

    let centre = RawPeak {
        frequency_hz: index as f32 * bin_hz,
        magnitude: peak,
    };
    if index == first || index == last {
        return centre;
    }

    let left = frame.magnitude(index - 1);
    let right = frame.magnitude(index + 1);
    if left <= 0.0 || peak <= 0.0 || right <= 0.0 {
        return centre;
    }

    let (dl, d0, dr) = (left.log10(), peak.log10(), right.log10());
    let denom = 2.0 * (dl + dr - 2.0 * d0);
    let delta = if denom.abs() <= FLAT_DENOMINATOR {
        0.0
    } else {
        (dl - dr) / denom
    };

    RawPeak {
        frequency_hz: (index as f32 + delta) * bin_hz,
        magnitude: 10f32.powf(d0 + (dl - dr) * delta / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::transform::{apply_window, hann_window, FftTransform, SpectralTransform};

    const SR: f32 = 22627.0;

    fn frame_with(n: usize, bins: &[(usize, f32)]) -> SpectralFrame {
        let mut re = vec![0.0; n];
        for &(bin, mag) in bins {
            re[bin] = mag;
        }
        SpectralFrame { re, im: vec![0.0; n] }
    }

    #[test]
    fn peak_on_lowest_scan_bin_is_not_interpolated() {
        let frame = frame_with(1024, &[(1, 50.0), (2, 40.0)]);
        let peak = estimate(&frame, SR);
        assert_eq!(peak.frequency_hz, SR / 1024.0);
        assert_eq!(peak.magnitude, 50.0);
    }

    #[test]
    fn peak_on_highest_scan_bin_is_not_interpolated() {
        let frame = frame_with(64, &[(29, 3.0), (30, 7.0)]);
        let peak = estimate(&frame, SR);
        assert_eq!(peak.frequency_hz, 30.0 * SR / 64.0);
        assert_eq!(peak.magnitude, 7.0);
    }

    #[test]
    fn nyquist_neighbourhood_is_not_scanned() {
        let frame = frame_with(64, &[(10, 1.0), (31, 100.0), (32, 100.0)]);
        let peak = estimate(&frame, SR);
        assert_eq!(peak.frequency_hz, 10.0 * SR / 64.0);
    }

    #[test]
    fn symmetric_neighbours_give_bin_centre() {
        let frame = frame_with(1024, &[(139, 5.0), (140, 10.0), (141, 5.0)]);
        let peak = estimate(&frame, SR);
        let expected = 140.0 * SR / 1024.0;
        assert!((peak.frequency_hz - expected).abs() < 1e-3);
        assert!((peak.frequency_hz - 3093.3).abs() < 1.0);
        assert!((peak.magnitude - 10.0).abs() < 1e-4);
    }

    #[test]
    fn zero_neighbour_falls_back_to_bin() {
        let frame = frame_with(1024, &[(140, 10.0), (141, 4.0)]);
        let peak = estimate(&frame, SR);
        assert_eq!(peak.frequency_hz, 140.0 * SR / 1024.0);
        assert_eq!(peak.magnitude, 10.0);
    }

    #[test]
    fn leans_toward_stronger_neighbour() {
        let frame = frame_with(1024, &[(139, 8.0), (140, 10.0), (141, 2.0)]);
        let peak = estimate(&frame, SR);
        let centre = 140.0 * SR / 1024.0;
        assert!(peak.frequency_hz < centre);
        assert!(peak.frequency_hz > centre - SR / 1024.0 / 2.0);
        assert!(peak.magnitude > 0.0);
    }

    #[test]
    fn tiny_frame_yields_empty_peak() {
        let frame = frame_with(4, &[(1, 1.0)]);
        assert_eq!(estimate(&frame, SR), RawPeak::default());
    }

    #[test]
    fn finds_windowed_tone_between_bins() {
        let n = 1024;
        let tone = 3100.0;
        let samples: Vec<f32> = (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * tone * i as f32 / SR).sin())
            .collect();
        let mut windowed = Vec::new();
        apply_window(&samples, &hann_window(n), &mut windowed);
        let frame = FftTransform::new(n).transform(&windowed);
        let peak = estimate(&frame, SR);
        assert!((peak.frequency_hz - tone).abs() < 5.0, "got {}", peak.frequency_hz);
        assert!(peak.magnitude > 100.0);
    }
}

// src/analysis/mod.rs

pub mod bands;
pub mod spectrum;
pub mod throttle;

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub use bands::BandReducer;
pub use spectrum::SpectralTransformer;
pub use throttle::{Clock, ManualClock, MonotonicClock, UpdateThrottle};

/// One interleaved stereo sample pair, left first.
pub type StereoFrame = [f32; 2];

/// Which side of a stereo frame feeds the analysis buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Left,
    Right,
}

impl Channel {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// No tapering; samples go into the transform verbatim.
    Rectangular,
    #[default]
    Hann,
}

/// Copies one channel of the first `filled` frames into `out`.
///
/// `out` is cleared first and ends up exactly `filled` long. Frames past `filled`
/// are never touched, so a partially filled buffer near end of stream is safe.
pub fn extract_channel_into(
    frames: &[StereoFrame],
    filled: usize,
    channel: Channel,
    out: &mut Vec<f32>,
) {
    out.clear();
    let filled = filled.min(frames.len());
    let idx = channel.index();
    out.extend(frames[..filled].iter().map(|frame| frame[idx]));
}

pub fn extract_channel(frames: &[StereoFrame], filled: usize, channel: Channel) -> Vec<f32> {
    let mut out = Vec::with_capacity(filled.min(frames.len()));
    extract_channel_into(frames, filled, channel, &mut out);
    out
}

/// Hann coefficient for `index` in a window of `size` points.
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Precomputed taper for a fixed buffer length.
#[derive(Debug, Clone)]
pub struct Window {
    coeffs: Vec<f32>,
}

impl Window {
    pub fn new(kind: WindowKind, size: usize) -> Self {
        let coeffs = match kind {
            WindowKind::Rectangular => vec![1.0; size],
            WindowKind::Hann => (0..size).map(|i| hann_window(i, size)).collect(),
        };
        Self { coeffs }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Multiplies `samples` in place. Samples beyond the window length are left alone.
    pub fn apply(&self, samples: &mut [f32]) {
        for (s, w) in samples.iter_mut().zip(&self.coeffs) {
            *s *= w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Vec<StereoFrame> {
        (0..n).map(|i| [i as f32, -(i as f32)]).collect()
    }

    #[test]
    fn extracts_left_channel_in_order() {
        let frames = ramp(6);
        assert_eq!(extract_channel(&frames, 6, Channel::Left), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn extracts_right_channel_without_normalizing() {
        let frames = vec![[0.0, 3.5], [0.0, -7.25]];
        assert_eq!(extract_channel(&frames, 2, Channel::Right), vec![3.5, -7.25]);
    }

    #[test]
    fn never_reads_past_filled_count() {
        let mut frames = ramp(8);
        frames[5] = [f32::NAN, f32::NAN];
        let out = extract_channel(&frames, 5, Channel::Left);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn zero_filled_gives_empty_buffer() {
        let frames = ramp(4);
        assert!(extract_channel(&frames, 0, Channel::Left).is_empty());
    }

    #[test]
    fn filled_larger_than_buffer_is_clamped() {
        let frames = ramp(3);
        assert_eq!(extract_channel(&frames, 10, Channel::Left).len(), 3);
    }

    #[test]
    fn hann_window_shape() {
        let size = 1024;
        assert_relative_eq!(hann_window(0, size), 0.0, epsilon = 1e-6);
        assert_relative_eq!(hann_window(size - 1, size), 0.0, epsilon = 1e-6);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn rectangular_window_is_identity() {
        let w = Window::new(WindowKind::Rectangular, 4);
        let mut samples = vec![1.0, -2.0, 3.0, -4.0];
        w.apply(&mut samples);
        assert_eq!(samples, vec![1.0, -2.0, 3.0, -4.0]);
    }
}

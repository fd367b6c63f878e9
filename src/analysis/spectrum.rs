// src/analysis/spectrum.rs

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Forward DFT of a fixed-length real buffer.
///
/// The plan is built once; each call allocates its own working buffer, so the
/// transformer holds no per-call state and can be shared across threads.
pub struct SpectralTransformer {
    len: usize,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectralTransformer {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        Self { len, fft }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of one-sided bins (DC through Nyquist) for this length.
    pub fn one_sided_len(&self) -> usize {
        one_sided_len(self.len)
    }

    /// Full complex spectrum in standard DFT order: DC, positive frequencies up to
    /// Nyquist, then the mirrored negative frequencies.
    ///
    /// Inputs shorter than the planned length are zero-padded; longer inputs are
    /// truncated to it.
    pub fn transform(&self, samples: &[f32]) -> Vec<Complex<f32>> {
        let mut buf = vec![Complex { re: 0.0, im: 0.0 }; self.len];
        for (slot, &s) in buf.iter_mut().zip(samples) {
            slot.re = s;
        }
        if self.len > 0 {
            let mut scratch = vec![Complex { re: 0.0, im: 0.0 }; self.fft.get_inplace_scratch_len()];
            self.fft.process_with_scratch(&mut buf, &mut scratch);
        }
        buf
    }

    /// `|X[k]|` for every bin of [`transform`](Self::transform).
    pub fn magnitudes(&self, samples: &[f32]) -> Vec<f32> {
        self.transform(samples).iter().map(|c| c.norm()).collect()
    }

    /// Magnitudes of bins `0..=len/2` only; the upper half of a real-input DFT
    /// mirrors these.
    pub fn one_sided_magnitudes(&self, samples: &[f32]) -> Vec<f32> {
        let mut mags = self.magnitudes(samples);
        mags.truncate(self.one_sided_len());
        mags
    }
}

pub fn one_sided_len(len: usize) -> usize {
    if len == 0 { 0 } else { len / 2 + 1 }
}

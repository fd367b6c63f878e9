// src/analysis/bands.rs

use crate::error::PipelineError;

/// Collapses a magnitude spectrum into `band_count` equal-width averages.
///
/// Bucket width is `floor(M / N)`. The `M - N * width` highest bins fall outside
/// every bucket and are dropped.
#[derive(Debug, Clone, Copy)]
pub struct BandReducer {
    band_count: usize,
}

impl BandReducer {
    pub fn new(band_count: usize) -> Result<Self, PipelineError> {
        if band_count == 0 {
            return Err(PipelineError::invalid("band count must be greater than zero"));
        }
        Ok(Self { band_count })
    }

    /// Like [`new`](Self::new), but also rejects a spectrum length that cannot fill
    /// one bin per band.
    pub fn for_spectrum(band_count: usize, spectrum_len: usize) -> Result<Self, PipelineError> {
        let reducer = Self::new(band_count)?;
        reducer.bucket_width(spectrum_len)?;
        Ok(reducer)
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn bucket_width(&self, spectrum_len: usize) -> Result<usize, PipelineError> {
        if spectrum_len < self.band_count {
            return Err(PipelineError::invalid(format!(
                "band count {} exceeds spectrum length {}",
                self.band_count, spectrum_len
            )));
        }
        Ok(spectrum_len / self.band_count)
    }

    /// Returns exactly `band_count` means, lowest frequency first.
    pub fn reduce(&self, magnitudes: &[f32]) -> Result<Vec<f32>, PipelineError> {
        let width = self.bucket_width(magnitudes.len())?;
        let used = width * self.band_count;
        Ok(magnitudes[..used]
            .chunks_exact(width)
            .map(|bucket| bucket.iter().map(|m| m.abs()).sum::<f32>() / width as f32)
            .collect())
    }
}

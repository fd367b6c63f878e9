// src/source/mod.rs

pub mod stream;

use crate::analysis::StereoFrame;
use crate::error::PipelineError;

pub use stream::{DecodedStream, open_http_stream};

/// Supplier of decoded stereo frames.
pub trait SampleSource: Send {
    /// Blocks until `buf` is filled or the stream ends, and returns how many frames
    /// were written. `Ok(0)` means the source is exhausted.
    fn read_frames(&mut self, buf: &mut [StereoFrame]) -> Result<usize, PipelineError>;

    fn sample_rate(&self) -> u32;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_frames(&mut self, buf: &mut [StereoFrame]) -> Result<usize, PipelineError> {
        (**self).read_frames(buf)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

/// Folds an interleaved block of `channels` channels into stereo frames.
///
/// Mono is duplicated to both sides; wider layouts average the even channels into
/// the left side and the odd ones into the right.
pub fn to_stereo(interleaved: &[f32], channels: usize, out: &mut Vec<StereoFrame>) {
    match channels {
        0 => {}
        1 => out.extend(interleaved.iter().map(|&s| [s, s])),
        2 => out.extend(interleaved.chunks_exact(2).map(|p| [p[0], p[1]])),
        _ => {
            for frame in interleaved.chunks_exact(channels) {
                let (mut l, mut nl, mut r, mut nr) = (0.0f32, 0usize, 0.0f32, 0usize);
                for (c, &s) in frame.iter().enumerate() {
                    if c % 2 == 0 {
                        l += s;
                        nl += 1;
                    } else {
                        r += s;
                        nr += 1;
                    }
                }
                out.push([l / nl as f32, r / nr.max(1) as f32]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated() {
        let mut out = Vec::new();
        to_stereo(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![[0.1, 0.1], [0.2, 0.2]]);
    }

    #[test]
    fn stereo_passes_through() {
        let mut out = Vec::new();
        to_stereo(&[1.0, 2.0, 3.0, 4.0], 2, &mut out);
        assert_eq!(out, vec![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn wide_layouts_are_folded() {
        let mut out = Vec::new();
        to_stereo(&[1.0, 2.0, 3.0, 4.0], 4, &mut out);
        assert_eq!(out, vec![[2.0, 3.0]]);
    }
}

// src/render/mod.rs

pub mod slot;
pub mod terminal;

use crate::error::PipelineError;
use crate::pipeline::{BandFrame, BandSink};
use slot::LatestSlot;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub use terminal::TerminalBars;

/// Draws one band vector. Called from the render thread only, one call at a time.
pub trait BandRenderer: Send {
    fn render(&mut self, bands: &[f32]) -> Result<(), anyhow::Error>;
}

impl<F> BandRenderer for F
where
    F: FnMut(&[f32]) -> Result<(), anyhow::Error> + Send,
{
    fn render(&mut self, bands: &[f32]) -> Result<(), anyhow::Error> {
        self(bands)
    }
}

/// Edge bands hidden from the display (DC side first, Nyquist side second).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandTrim {
    pub leading: usize,
    pub trailing: usize,
}

impl BandTrim {
    pub fn new(leading: usize, trailing: usize) -> Self {
        Self { leading, trailing }
    }

    /// Fails if trimming would leave nothing of `band_count` bands.
    pub fn validate(&self, band_count: usize) -> Result<(), PipelineError> {
        if self.leading + self.trailing >= band_count {
            return Err(PipelineError::invalid(format!(
                "trim {}+{} leaves no bands out of {}",
                self.leading, self.trailing, band_count
            )));
        }
        Ok(())
    }

    /// Bands left after trimming. Over-trimming yields an empty slice, not a panic.
    pub fn apply<'a>(&self, bands: &'a [f32]) -> &'a [f32] {
        let start = self.leading.min(bands.len());
        let end = bands.len().saturating_sub(self.trailing).max(start);
        &bands[start..end]
    }

    pub fn visible(&self, band_count: usize) -> usize {
        band_count.saturating_sub(self.leading + self.trailing)
    }
}

/// Producer half of the render handoff.
#[derive(Clone)]
pub struct BandPublisher {
    slot: Arc<LatestSlot<BandFrame>>,
}

impl BandSink for BandPublisher {
    fn deliver(&self, frame: BandFrame) {
        self.slot.publish(frame);
    }
}

/// Owns the render thread. Frames reach the renderer through a single-slot handoff,
/// so redraws never overlap and a slow renderer only ever sees the newest frame.
pub struct RenderWorker {
    slot: Arc<LatestSlot<BandFrame>>,
    handle: Option<JoinHandle<u64>>,
}

impl RenderWorker {
    pub fn spawn<R>(mut renderer: R, trim: BandTrim) -> Result<Self, anyhow::Error>
    where
        R: BandRenderer + 'static,
    {
        let slot = Arc::new(LatestSlot::<BandFrame>::new());
        let rx = slot.clone();
        let handle = thread::Builder::new()
            .name("radio-render".into())
            .spawn(move || {
                let mut drawn = 0u64;
                while let Some(frame) = rx.take() {
                    if let Err(e) = renderer.render(trim.apply(&frame.bands)) {
                        warn!("[render] frame {} failed: {e}", frame.seq);
                    }
                    drawn += 1;
                }
                drawn
            })?;
        Ok(Self {
            slot,
            handle: Some(handle),
        })
    }

    pub fn publisher(&self) -> BandPublisher {
        BandPublisher {
            slot: self.slot.clone(),
        }
    }

    /// Closes the handoff, lets the pending frame (if any) draw, and joins.
    /// Returns how many frames were drawn.
    pub fn shutdown(mut self) -> u64 {
        self.finish()
    }

    fn finish(&mut self) -> u64 {
        self.slot.close();
        let drawn = match self.handle.take() {
            Some(h) => h.join().unwrap_or_else(|_| {
                warn!("[render] render thread panicked");
                0
            }),
            None => 0,
        };
        debug!(
            "[render] drew {drawn} frames, {} superseded",
            self.slot.superseded()
        );
        drawn
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.finish();
        }
    }
}

// src/pipeline.rs

use crate::analysis::{
    BandReducer, Channel, Clock, MonotonicClock, SpectralTransformer, StereoFrame,
    UpdateThrottle, Window, extract_channel_into,
};
use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::source::SampleSource;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Streaming,
    Stopped,
    Ended,
}

/// How a call to [`Pipeline::run`] finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A stop was requested.
    Stopped,
    /// The source ran dry.
    Exhausted,
    /// The source failed; the stream was abandoned.
    Failed(PipelineError),
}

/// One throttled analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct BandFrame {
    pub seq: u64,
    pub captured_at: Instant,
    pub bands: Vec<f32>,
}

/// Destination of band frames that passed the throttle.
pub trait BandSink: Send + Sync {
    /// Must not block: it runs inside the throttle's critical section.
    fn deliver(&self, frame: BandFrame);
}

/// Playback hook, handed every block of frames read from the source.
pub trait FrameOutput: Send {
    fn write(&mut self, frames: &[StereoFrame]) -> Result<(), PipelineError>;
}

/// Discards frames; for runs without an audio device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl FrameOutput for NullOutput {
    fn write(&mut self, _frames: &[StereoFrame]) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[derive(Debug)]
struct ControlInner {
    stop: AtomicBool,
    state: Mutex<PipelineState>,
}

/// Shared handle for stopping a pipeline and observing its state from other threads.
#[derive(Debug, Clone)]
pub struct PipelineControl {
    inner: Arc<ControlInner>,
}

impl PipelineControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ControlInner {
                stop: AtomicBool::new(false),
                state: Mutex::new(PipelineState::Idle),
            }),
        }
    }

    /// Takes effect at the next buffer boundary; the cycle in flight completes.
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PipelineState {
        *self.inner.state.lock()
    }

    fn set_state(&self, state: PipelineState) {
        let mut cur = self.inner.state.lock();
        if *cur != state {
            debug!("[pipeline] {:?} -> {:?}", *cur, state);
            *cur = state;
        }
    }

    fn clear_stop(&self) {
        self.inner.stop.store(false, Ordering::Release);
    }
}

impl Default for PipelineControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract → transform → reduce → throttle, driven one buffer at a time.
pub struct Pipeline {
    buffer_frames: usize,
    channel: Channel,
    window: Window,
    transformer: SpectralTransformer,
    reducer: BandReducer,
    throttle: UpdateThrottle,
    control: PipelineControl,
    frames: Vec<StereoFrame>,
    samples: Vec<f32>,
    seq: u64,
}

impl Pipeline {
    pub fn new(config: &AnalysisConfig) -> Result<Self, PipelineError> {
        Self::with_clock(config, MonotonicClock)
    }

    pub fn with_clock(
        config: &AnalysisConfig,
        clock: impl Clock + 'static,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let transformer = SpectralTransformer::new(config.buffer_frames);
        let reducer = BandReducer::for_spectrum(config.band_count, transformer.one_sided_len())?;
        let throttle = UpdateThrottle::with_clock(config.min_interval(), clock)?;

        Ok(Self {
            buffer_frames: config.buffer_frames,
            channel: config.channel,
            window: Window::new(config.window, config.buffer_frames),
            transformer,
            reducer,
            throttle,
            control: PipelineControl::new(),
            frames: vec![[0.0; 2]; config.buffer_frames],
            samples: Vec::with_capacity(config.buffer_frames),
            seq: 0,
        })
    }

    pub fn control(&self) -> PipelineControl {
        self.control.clone()
    }

    pub fn band_count(&self) -> usize {
        self.reducer.band_count()
    }

    /// Band vector for one channel buffer. Short buffers are zero-padded to the
    /// configured length, so this never fails for a constructed pipeline.
    pub fn analyze(&self, samples: &[f32]) -> Vec<f32> {
        let mut buf = vec![0.0f32; self.buffer_frames];
        let n = samples.len().min(self.buffer_frames);
        buf[..n].copy_from_slice(&samples[..n]);
        self.window.apply(&mut buf);
        let mags = self.transformer.one_sided_magnitudes(&buf);
        debug_assert!(mags.len() >= self.reducer.band_count());
        match self.reducer.reduce(&mags) {
            Ok(bands) => bands,
            Err(e) => {
                // The reducer was sized against this transformer at construction.
                warn!("[pipeline] band reduction failed, showing silence: {e}");
                vec![0.0; self.reducer.band_count()]
            }
        }
    }

    /// Runs one analysis cycle on `filled` frames and offers the result to the
    /// throttle. Returns whether it reached `sink`.
    fn cycle<B: BandSink + ?Sized>(&mut self, filled: usize, sink: &B) -> bool {
        extract_channel_into(&self.frames, filled, self.channel, &mut self.samples);
        if self.samples.is_empty() {
            return false;
        }
        let captured_at = self.throttle.now();
        let bands = self.analyze(&self.samples);
        self.seq += 1;
        let frame = BandFrame {
            seq: self.seq,
            captured_at,
            bands,
        };
        self.throttle
            .offer_at(captured_at, frame, |frame| sink.deliver(frame))
    }

    /// Pulls buffers from `source` until it ends, fails, or a stop is requested.
    ///
    /// The state goes `Streaming` → `Stopped` | `Ended` → `Idle`; `Idle` is set
    /// before returning. A pending stop request is consumed.
    pub fn run<S, O, B>(&mut self, source: &mut S, output: &mut O, sink: &B) -> StreamOutcome
    where
        S: SampleSource + ?Sized,
        O: FrameOutput + ?Sized,
        B: BandSink + ?Sized,
    {
        self.control.set_state(PipelineState::Streaming);
        info!(
            "[pipeline] streaming: {} frames/cycle at {} Hz, {} bands",
            self.buffer_frames,
            source.sample_rate(),
            self.reducer.band_count()
        );

        let mut cycles = 0u64;
        let mut delivered = 0u64;
        let outcome = loop {
            if self.control.stop_requested() {
                break StreamOutcome::Stopped;
            }

            let filled = match source.read_frames(&mut self.frames) {
                Ok(0) => break StreamOutcome::Exhausted,
                Ok(n) => n.min(self.frames.len()),
                Err(e) => {
                    warn!("[pipeline] source failed: {e}");
                    break StreamOutcome::Failed(e);
                }
            };

            if let Err(e) = output.write(&self.frames[..filled]) {
                warn!("[pipeline] output failed: {e}");
                break StreamOutcome::Failed(e);
            }

            cycles += 1;
            if self.cycle(filled, sink) {
                delivered += 1;
            }
        };

        let terminal = match outcome {
            StreamOutcome::Stopped => PipelineState::Stopped,
            _ => PipelineState::Ended,
        };
        self.control.set_state(terminal);
        info!("[pipeline] {outcome:?} after {cycles} cycles, {delivered} delivered");

        self.control.clear_stop();
        self.throttle.reset();
        self.control.set_state(PipelineState::Idle);
        outcome
    }
}

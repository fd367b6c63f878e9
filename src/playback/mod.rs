// src/playback/mod.rs

pub mod device;
pub mod resample;

use crate::analysis::StereoFrame;
use crate::error::PipelineError;
use crate::pipeline::{FrameOutput, PipelineControl};
use cpal::Stream;
use cpal::traits::StreamTrait;
use device::{build_stream_for_format, setup_output_device};
use resample::StreamResampler;
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::{
    Arc,
    atomic::{AtomicU32, AtomicU64, Ordering},
};
use std::time::Duration;

/// Audio buffered between the decoder and the device.
const RING_LATENCY_MS: u32 = 250;
const START_FADE_MS: u32 = 10;

#[inline]
pub fn fade_samples_ms(sample_rate: u32, ms: u32) -> usize {
    ((sample_rate as u64 * ms as u64) / 1000) as usize
}

/// Maps stereo frames onto `out_channels` interleaved device channels.
/// Mono devices get the average; extra channels beyond two stay silent.
pub fn frames_to_device(frames: &[StereoFrame], out_channels: usize, out: &mut Vec<f32>) {
    match out_channels {
        0 => {}
        1 => out.extend(frames.iter().map(|[l, r]| 0.5 * (l + r))),
        2 => out.extend(frames.iter().flatten()),
        n => {
            for [l, r] in frames {
                out.push(*l);
                out.push(*r);
                out.extend(std::iter::repeat_n(0.0, n - 2));
            }
        }
    }
}

/// Running output stream plus its shared controls. Dropping it silences playback.
pub struct AudioOutput {
    _stream: Stream,
    volume: Arc<AtomicU32>,
    played_samples: Arc<AtomicU64>,
    sample_rate: u32,
    channels: usize,
}

impl AudioOutput {
    pub fn set_volume(&self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        self.volume.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Wall time of audio actually handed to the device.
    pub fn elapsed(&self) -> Duration {
        let samples = self.played_samples.load(Ordering::Relaxed) as f64;
        let frames = samples / self.channels.max(1) as f64;
        Duration::from_secs_f64(frames / self.sample_rate.max(1) as f64)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Pipeline-side writer into the device ring buffer.
///
/// `write` blocks while the ring is full, which paces the whole pipeline to real
/// time. It gives up as soon as a stop is requested.
pub struct PlaybackFeed<P> {
    producer: P,
    out_channels: usize,
    resampler: Option<StreamResampler>,
    control: PipelineControl,
    fade_remaining: usize,
    fade_total: usize,
    interleaved: Vec<f32>,
    resampled: Vec<f32>,
}

impl<P> PlaybackFeed<P>
where
    P: Producer<Item = f32> + Send,
{
    pub fn new(
        producer: P,
        source_rate: u32,
        out_rate: u32,
        out_channels: usize,
        control: PipelineControl,
    ) -> Result<Self, anyhow::Error> {
        let resampler = StreamResampler::new(source_rate, out_rate, out_channels)?;
        let fade_total = fade_samples_ms(out_rate, START_FADE_MS) * out_channels;
        Ok(Self {
            producer,
            out_channels,
            resampler,
            control,
            fade_remaining: fade_total,
            fade_total,
            interleaved: Vec::with_capacity(8192),
            resampled: Vec::with_capacity(8192),
        })
    }

    fn push_blocking(&mut self, use_resampled: bool) {
        let data = if use_resampled {
            &mut self.resampled
        } else {
            &mut self.interleaved
        };

        if self.fade_remaining > 0 {
            let done = self.fade_total - self.fade_remaining;
            let n = self.fade_remaining.min(data.len());
            for (i, s) in data[..n].iter_mut().enumerate() {
                *s *= (done + i) as f32 / self.fade_total as f32;
            }
            self.fade_remaining -= n;
        }

        let mut idx = 0usize;
        while idx < data.len() {
            if self.control.stop_requested() {
                return;
            }
            let pushed = self.producer.push_slice(&data[idx..]);
            if pushed == 0 {
                std::thread::park_timeout(Duration::from_micros(500));
            }
            idx += pushed;
        }
    }
}

impl<P> FrameOutput for PlaybackFeed<P>
where
    P: Producer<Item = f32> + Send,
{
    fn write(&mut self, frames: &[StereoFrame]) -> Result<(), PipelineError> {
        self.interleaved.clear();
        frames_to_device(frames, self.out_channels, &mut self.interleaved);

        let use_resampled = match self.resampler.as_mut() {
            Some(r) => {
                self.resampled.clear();
                r.process(&self.interleaved, &mut self.resampled)
                    .map_err(|e| PipelineError::SourceFailure(format!("resampling: {e}")))?;
                true
            }
            None => false,
        };

        self.push_blocking(use_resampled);
        Ok(())
    }
}

/// Opens the default device and returns the running stream with the feed that fills it.
pub fn open_playback(
    source_rate: u32,
    control: PipelineControl,
) -> Result<(AudioOutput, PlaybackFeed<HeapProd<f32>>), anyhow::Error> {
    let output = setup_output_device()?;
    let capacity = (fade_samples_ms(output.output_sample_rate, RING_LATENCY_MS)
        * output.output_channels)
        .max(4096);
    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

    let volume = Arc::new(AtomicU32::new(1.0f32.to_bits()));
    let played_samples = Arc::new(AtomicU64::new(0));
    let stream = build_stream_for_format(&output, volume.clone(), played_samples.clone(), consumer)?;
    stream.play()?;

    let feed = PlaybackFeed::new(
        producer,
        source_rate,
        output.output_sample_rate,
        output.output_channels,
        control,
    )?;

    Ok((
        AudioOutput {
            _stream: stream,
            volume,
            played_samples,
            sample_rate: output.output_sample_rate,
            channels: output.output_channels,
        },
        feed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::{Consumer, Observer};

    #[test]
    fn device_mapping_for_common_layouts() {
        let frames = [[1.0, 3.0], [-1.0, 1.0]];
        let mut out = Vec::new();
        frames_to_device(&frames, 1, &mut out);
        assert_eq!(out, vec![2.0, 0.0]);

        out.clear();
        frames_to_device(&frames, 2, &mut out);
        assert_eq!(out, vec![1.0, 3.0, -1.0, 1.0]);

        out.clear();
        frames_to_device(&frames, 4, &mut out);
        assert_eq!(out, vec![1.0, 3.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn feed_fades_in_then_passes_through() {
        let (prod, mut cons) = HeapRb::<f32>::new(64).split();
        // 1 kHz, 10 ms fade -> 10 frames * 2 channels
        let mut feed = PlaybackFeed::new(prod, 1000, 1000, 2, PipelineControl::new()).unwrap();
        feed.write(&[[1.0, 1.0]; 20]).unwrap();

        let mut out = Vec::new();
        while let Some(s) = cons.try_pop() {
            out.push(s);
        }
        assert_eq!(out.len(), 40);
        assert_eq!(out[0], 0.0);
        assert!(out[1] > 0.0 && out[1] < 1.0);
        assert!(out[..20].windows(2).all(|w| w[0] <= w[1]));
        assert!(out[20..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn full_ring_is_abandoned_on_stop() {
        let (prod, cons) = HeapRb::<f32>::new(8).split();
        let control = PipelineControl::new();
        let mut feed = PlaybackFeed::new(prod, 1000, 1000, 2, control.clone()).unwrap();
        control.request_stop();
        // Would block forever on an 8-sample ring without the stop check.
        feed.write(&[[0.5, 0.5]; 100]).unwrap();
        assert!(cons.occupied_len() <= 8);
    }
}

// src/playback/device.rs

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::Consumer;
use std::sync::{
    Arc,
    atomic::{AtomicU32, AtomicU64, Ordering},
};
use tracing::{error, info};

/// Default output device and the format it wants.
pub struct OutputConfig {
    pub device: Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
    pub output_channels: usize,
    pub output_sample_rate: u32,
}

pub fn setup_output_device() -> Result<OutputConfig, anyhow::Error> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no output device available")?;
    let supported_config = device
        .default_output_config()
        .context("querying default output config")?;
    let sample_format = supported_config.sample_format();
    let config = supported_config.config();
    let output_channels = config.channels as usize;
    let output_sample_rate = config.sample_rate.0;

    info!(
        "[output] device: channels={}, sample_rate={}, format={:?}",
        output_channels, output_sample_rate, sample_format
    );

    Ok(OutputConfig {
        device,
        config,
        sample_format,
        output_channels,
        output_sample_rate,
    })
}

fn report_stream_error(err: cpal::StreamError) {
    error!("[output] stream error: {err}");
}

/// Output stream that drains `consumer`, scaled by `volume`. Underruns play silence.
pub fn build_stream<T, C>(
    device: &Device,
    config: &StreamConfig,
    volume: Arc<AtomicU32>,
    played_samples: Arc<AtomicU64>,
    mut consumer: C,
) -> Result<Stream, anyhow::Error>
where
    T: cpal::Sample + cpal::FromSample<f32> + SizedSample,
    C: Consumer<Item = f32> + Send + 'static,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let vol = f32::from_bits(volume.load(Ordering::Relaxed));
                let mut played = 0u64;
                for out in data.iter_mut() {
                    let s = match consumer.try_pop() {
                        Some(s) => {
                            played += 1;
                            s
                        }
                        None => 0.0,
                    };
                    *out = T::from_sample(s * vol);
                }
                played_samples.fetch_add(played, Ordering::Relaxed);
            },
            report_stream_error,
            None,
        )
        .map_err(Into::into)
}

/// Picks the `build_stream` instantiation for the device's sample format.
pub fn build_stream_for_format<C>(
    output: &OutputConfig,
    volume: Arc<AtomicU32>,
    played_samples: Arc<AtomicU64>,
    consumer: C,
) -> Result<Stream, anyhow::Error>
where
    C: Consumer<Item = f32> + Send + 'static,
{
    let OutputConfig {
        device,
        config,
        sample_format,
        ..
    } = output;
    match sample_format {
        SampleFormat::F32 => build_stream::<f32, _>(device, config, volume, played_samples, consumer),
        SampleFormat::I16 => build_stream::<i16, _>(device, config, volume, played_samples, consumer),
        SampleFormat::U16 => build_stream::<u16, _>(device, config, volume, played_samples, consumer),
        other => anyhow::bail!("unsupported sample format: {other:?}"),
    }
}

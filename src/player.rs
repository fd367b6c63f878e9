// src/player.rs

use crate::config::RadioConfig;
use crate::pipeline::{Pipeline, PipelineControl, PipelineState, StreamOutcome};
use crate::playback::{AudioOutput, open_playback};
use crate::render::{BandRenderer, RenderWorker};
use crate::source::SampleSource;
use crate::source::stream::open_location;
use crate::station::Station;
use anyhow::Context;
use reqwest::blocking::Client;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// One station playing: output device, render thread and the pipeline thread
/// that reads, plays and analyzes the stream.
pub struct RadioPlayer {
    station_name: String,
    output: AudioOutput,
    render: Option<RenderWorker>,
    control: PipelineControl,
    pipeline_handle: Option<JoinHandle<StreamOutcome>>,
}

impl RadioPlayer {
    /// Connects to `station` and starts playing. Configuration problems surface
    /// here, before anything is fetched.
    pub fn start<R>(
        client: &Client,
        station: &Station,
        config: &RadioConfig,
        renderer: R,
    ) -> Result<Self, anyhow::Error>
    where
        R: BandRenderer + 'static,
    {
        config.validate()?;
        let mut pipeline = Pipeline::new(&config.analysis)?;
        let control = pipeline.control();

        let mut source = open_location(client, &station.url)
            .with_context(|| format!("opening stream for {}", station.name))?;
        let sample_rate = source.sample_rate();
        println!(
            "📻 {}: {} Hz, {} channel(s)",
            station.name,
            sample_rate,
            source.source_channels()
        );

        let (output, mut feed) = open_playback(sample_rate, control.clone())?;
        let render = RenderWorker::spawn(renderer, config.display.trim())?;
        let publisher = render.publisher();

        let pipeline_handle = thread::Builder::new()
            .name("radio-pipeline".into())
            .spawn(move || pipeline.run(&mut source, &mut feed, &publisher))
            .context("spawning pipeline thread")?;

        info!("[player] started {}", station.name);

        Ok(Self {
            station_name: station.name.clone(),
            output,
            render: Some(render),
            control,
            pipeline_handle: Some(pipeline_handle),
        })
    }

    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    pub fn state(&self) -> PipelineState {
        self.control.state()
    }

    /// True once the pipeline thread has returned on its own (source ended or failed).
    pub fn is_finished(&self) -> bool {
        self.pipeline_handle
            .as_ref()
            .is_none_or(|h| h.is_finished())
    }

    pub fn set_volume(&self, level: f32) {
        self.output.set_volume(level);
    }

    pub fn volume(&self) -> f32 {
        self.output.volume()
    }

    pub fn adjust_volume(&self, delta: f32) -> f32 {
        self.set_volume(self.volume() + delta);
        self.volume()
    }

    pub fn elapsed(&self) -> Duration {
        self.output.elapsed()
    }

    /// Requests a stop, waits for the in-flight cycle to finish, then tears down
    /// rendering and audio output.
    pub fn stop(mut self) -> StreamOutcome {
        self.control.request_stop();
        let outcome = match self.pipeline_handle.take() {
            Some(h) => h.join().unwrap_or_else(|_| {
                warn!("[player] pipeline thread panicked");
                StreamOutcome::Stopped
            }),
            None => StreamOutcome::Stopped,
        };
        if let Some(render) = self.render.take() {
            render.shutdown();
        }
        info!("[player] {} finished: {outcome:?}", self.station_name);
        outcome
    }
}

impl Drop for RadioPlayer {
    fn drop(&mut self) {
        self.control.request_stop();
        if let Some(h) = self.pipeline_handle.take() {
            let _ = h.join();
        }
    }
}

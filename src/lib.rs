// src/lib.rs

pub mod analysis;
pub mod config;
pub mod error;
pub mod now_playing;
pub mod pipeline;
pub mod playback;
pub mod player;
pub mod render;
pub mod source;
pub mod station;
pub mod telemetry;

pub use config::RadioConfig;
pub use error::PipelineError;
pub use pipeline::{BandFrame, BandSink, Pipeline, PipelineControl, PipelineState, StreamOutcome};
pub use player::RadioPlayer;
pub use station::{Station, StationList};

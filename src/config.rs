// src/config.rs

use crate::analysis::spectrum::one_sided_len;
use crate::analysis::{Channel, WindowKind};
use crate::error::PipelineError;
use crate::render::BandTrim;
use crate::station::{Station, default_stations};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "radio.json";

/// Settings the analysis pipeline reads once at start.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub band_count: usize,
    pub min_interval_ms: u64,
    /// Frames per analysis cycle (one playback quantum).
    pub buffer_frames: usize,
    pub channel: Channel,
    pub window: WindowKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            band_count: 10,
            min_interval_ms: 50,
            buffer_frames: 4096,
            channel: Channel::Left,
            window: WindowKind::Hann,
        }
    }
}

impl AnalysisConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Length of the magnitude spectrum fed to the band reducer.
    pub fn spectrum_len(&self) -> usize {
        one_sided_len(self.buffer_frames)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.band_count == 0 {
            return Err(PipelineError::invalid("band_count must be greater than zero"));
        }
        if self.min_interval_ms == 0 {
            return Err(PipelineError::invalid("min_interval_ms must be greater than zero"));
        }
        if self.buffer_frames == 0 {
            return Err(PipelineError::invalid("buffer_frames must be greater than zero"));
        }
        if self.band_count > self.spectrum_len() {
            return Err(PipelineError::invalid(format!(
                "band_count {} exceeds the {} spectrum bins of a {}-frame buffer",
                self.band_count,
                self.spectrum_len(),
                self.buffer_frames
            )));
        }
        Ok(())
    }
}

/// Presentation settings for the bar chart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Bands dropped from the low end (DC) before drawing.
    pub trim_leading: usize,
    /// Bands dropped from the high end (near Nyquist) before drawing.
    pub trim_trailing: usize,
    pub height: usize,
    pub bar_width: usize,
    /// Per-frame decay of the reference peak used for scaling, in (0, 1].
    pub peak_decay: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            trim_leading: 1,
            trim_trailing: 0,
            height: 16,
            bar_width: 3,
            peak_decay: 0.9,
        }
    }
}

impl DisplayConfig {
    pub fn trim(&self) -> BandTrim {
        BandTrim::new(self.trim_leading, self.trim_trailing)
    }

    pub fn validate(&self, band_count: usize) -> Result<(), PipelineError> {
        self.trim().validate(band_count)?;
        if self.height == 0 || self.bar_width == 0 {
            return Err(PipelineError::invalid("display height and bar_width must be non-zero"));
        }
        if !(self.peak_decay > 0.0 && self.peak_decay <= 1.0) {
            return Err(PipelineError::invalid("peak_decay must be in (0, 1]"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: u64,
    /// Longest wait for any single read, stream bodies included. A stalled
    /// station turns into a source failure after this long.
    pub read_timeout_secs: u64,
    /// Deadline for the whole track-list request.
    pub playlist_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 15,
            playlist_timeout_secs: 10,
            user_agent: concat!("radio_modules/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn playlist_timeout(&self) -> Duration {
        Duration::from_secs(self.playlist_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.read_timeout_secs == 0 {
            return Err(PipelineError::invalid("read timeout must be greater than zero"));
        }
        if self.playlist_timeout_secs == 0 {
            return Err(PipelineError::invalid(
                "playlist timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RadioConfig {
    pub analysis: AnalysisConfig,
    pub display: DisplayConfig,
    pub network: NetworkConfig,
    pub stations: Vec<Station>,
    /// Log destination while playing. Without one, only errors reach stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            display: DisplayConfig::default(),
            network: NetworkConfig::default(),
            stations: default_stations(),
            log_file: None,
        }
    }
}

impl RadioConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.analysis.validate()?;
        self.display.validate(self.analysis.band_count)?;
        self.network.validate()?;
        if self.stations.is_empty() {
            return Err(PipelineError::invalid("no stations configured"));
        }
        Ok(())
    }

    pub fn save_to_disk(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("creating {}", path.as_ref().display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_from_disk(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("opening {}", path.as_ref().display()))?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .with_context(|| format!("parsing {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Missing file means defaults; a file that exists but does not parse is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_disk(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RadioConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg: RadioConfig =
            serde_json::from_str(r#"{ "analysis": { "band_count": 16, "channel": "right" } }"#)
                .unwrap();
        assert_eq!(cfg.analysis.band_count, 16);
        assert_eq!(cfg.analysis.channel, Channel::Right);
        assert_eq!(cfg.analysis.buffer_frames, 4096);
        assert_eq!(cfg.stations.len(), 5);
    }

    #[test]
    fn rejects_zero_bands_and_zero_interval() {
        let mut a = AnalysisConfig::default();
        a.band_count = 0;
        assert!(matches!(a.validate(), Err(PipelineError::InvalidConfiguration(_))));
        let mut a = AnalysisConfig::default();
        a.min_interval_ms = 0;
        assert!(matches!(a.validate(), Err(PipelineError::InvalidConfiguration(_))));
        let mut a = AnalysisConfig::default();
        a.buffer_frames = 0;
        assert!(matches!(a.validate(), Err(PipelineError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_more_bands_than_spectrum_bins() {
        let a = AnalysisConfig {
            band_count: 10,
            buffer_frames: 16,
            ..Default::default()
        };
        // 16 frames -> 9 one-sided bins
        assert!(a.validate().is_err());
        let a = AnalysisConfig {
            band_count: 9,
            buffer_frames: 16,
            ..Default::default()
        };
        assert!(a.validate().is_ok());
    }

    #[test]
    fn network_timeouts_default_and_override() {
        let cfg = RadioConfig::default();
        assert_eq!(cfg.network.read_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.network.playlist_timeout(), Duration::from_secs(10));
        assert!(cfg.log_file.is_none());

        let cfg: RadioConfig = serde_json::from_str(
            r#"{ "network": { "playlist_timeout_secs": 3 }, "log_file": "radio.log" }"#,
        )
        .unwrap();
        assert_eq!(cfg.network.playlist_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.network.read_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.log_file, Some(PathBuf::from("radio.log")));
    }

    #[test]
    fn unbounded_reads_are_rejected() {
        let mut cfg = RadioConfig::default();
        cfg.network.read_timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(PipelineError::InvalidConfiguration(_))));
    }

    #[test]
    fn trim_must_leave_a_band() {
        let d = DisplayConfig {
            trim_leading: 2,
            trim_trailing: 2,
            ..Default::default()
        };
        assert!(d.validate(4).is_err());
        assert!(d.validate(5).is_ok());
    }

    #[test]
    fn disk_round_trip() {
        let path = std::env::temp_dir().join(format!("radio_cfg_{}.json", std::process::id()));
        let mut cfg = RadioConfig::default();
        cfg.display.trim_trailing = 2;
        cfg.save_to_disk(&path).unwrap();
        let loaded = RadioConfig::load_from_disk(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = RadioConfig::load_or_default("/definitely/not/here/radio.json").unwrap();
        assert_eq!(cfg, RadioConfig::default());
    }
}

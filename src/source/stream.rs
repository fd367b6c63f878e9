// src/source/stream.rs

use super::{SampleSource, to_stereo};
use crate::analysis::StereoFrame;
use crate::config::NetworkConfig;
use crate::error::PipelineError;
use anyhow::Context;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

/// Symphonia decoder over any media source, yielding stereo frames.
pub struct DecodedStream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    source_channels: usize,
    sample_buf: Option<SampleBuffer<f32>>,
    pending: Vec<StereoFrame>,
    pos: usize,
    finished: bool,
}

impl DecodedStream {
    pub fn open(source: Box<dyn MediaSource>, hint: &Hint) -> Result<Self, anyhow::Error> {
        let mss = MediaSourceStream::new(source, Default::default());
        let probed = get_probe()
            .format(hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .context("probing stream format")?;
        let format = probed.format;

        let track = format
            .default_track()
            .context("no default audio track found")?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params.sample_rate.context("missing sample rate")?;
        let source_channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let decoder = get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .context("creating decoder")?;

        info!("[decoder] opened: channels={source_channels}, sample_rate={sample_rate}");

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            source_channels,
            sample_buf: None,
            pending: Vec::with_capacity(4096),
            pos: 0,
            finished: false,
        })
    }

    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }
        Self::open(Box::new(file), &hint)
    }

    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    /// Decodes packets until one yields frames. `Ok(false)` at end of stream.
    fn decode_next(&mut self) -> Result<bool, PipelineError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("[decoder] end of stream");
                    return Ok(false);
                }
                Err(e) => return Err(PipelineError::source(e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let spec = *decoded.spec();
                    let too_small = self
                        .sample_buf
                        .as_ref()
                        .is_none_or(|b| b.capacity() < decoded.capacity());
                    if too_small {
                        self.sample_buf =
                            Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
                    }
                    let Some(buf) = self.sample_buf.as_mut() else {
                        continue;
                    };
                    buf.copy_interleaved_ref(decoded);
                    to_stereo(buf.samples(), spec.channels.count(), &mut self.pending);
                    return Ok(true);
                }
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!("[decoder] skipping undecodable packet: {msg}");
                    continue;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(e) => return Err(PipelineError::source(e)),
            }
        }
    }
}

impl SampleSource for DecodedStream {
    fn read_frames(&mut self, buf: &mut [StereoFrame]) -> Result<usize, PipelineError> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos >= self.pending.len() {
                self.pending.clear();
                self.pos = 0;
                if self.finished {
                    break;
                }
                if !self.decode_next()? {
                    self.finished = true;
                    break;
                }
                continue;
            }
            let n = (buf.len() - filled).min(self.pending.len() - self.pos);
            buf[filled..filled + n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
            filled += n;
            self.pos += n;
        }
        Ok(filled)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Makes a `Read + Send` body usable where symphonia wants `Send + Sync`.
struct SyncReader<R>(Mutex<R>);

impl<R: Read + Send> Read for SyncReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.get_mut().read(buf)
    }
}

/// Client for stream and playlist requests.
///
/// The blocking client applies `timeout` to every body read rather than to the
/// whole body, so an endless stream keeps flowing while a stalled one fails with
/// a timed-out read.
pub fn http_client(network: &NetworkConfig) -> Result<Client, anyhow::Error> {
    Client::builder()
        .connect_timeout(network.connect_timeout())
        .timeout(network.read_timeout())
        .user_agent(network.user_agent.clone())
        .build()
        .context("building HTTP client")
}

pub fn open_http_stream(client: &Client, url: &str) -> Result<DecodedStream, anyhow::Error> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .with_context(|| format!("requesting {url}"))?;

    let mut hint = Hint::new();
    if let Some(mime) = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
    {
        hint.mime_type(mime.trim());
    }

    let body = ReadOnlySource::new(SyncReader(Mutex::new(response)));
    DecodedStream::open(Box::new(body), &hint)
}

/// Opens `location` over HTTP(S) when it looks like a URL, else as a local file.
pub fn open_location(client: &Client, location: &str) -> Result<DecodedStream, anyhow::Error> {
    if location.starts_with("http://") || location.starts_with("https://") {
        open_http_stream(client, location)
    } else {
        DecodedStream::open_file(location)
    }
}

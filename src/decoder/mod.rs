//! Video decoding
//!
//! The platform decoder sits behind [`VideoDecoder`]; [`DecodeGate`] wraps it
//! and enforces keyframe-first submission. Decoded frames and asynchronous
//! decoder errors come back to the processing context through a
//! [`DecoderOutput`] channel.

pub mod codec;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
pub mod gate;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::pipeline::types::{EncodedUnit, StreamConfig, Timestamp};

pub use codec::CodecFamily;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegDecoder;
pub use gate::{DecodeGate, GateOutcome};

/// Decoded video frame with raw pixel data (packed planar YUV 4:2:0).
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Timestamp,
}

/// How a unit is tagged when handed to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Key,
    Delta,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Key => "key",
            ChunkKind::Delta => "delta",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters the decoder is (re)created with
///
/// There is intentionally no out-of-band description: parameter sets are
/// read in-band from keyframes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    pub codec: String,
    pub coded_width: u32,
    pub coded_height: u32,
    pub low_latency: bool,
    /// Distinguishes this configuration from earlier ones; echoed on every frame
    pub generation: u64,
}

impl DecoderConfig {
    pub fn new(stream: &StreamConfig, generation: u64) -> Self {
        Self {
            codec: stream.codec.clone(),
            coded_width: stream.width,
            coded_height: stream.height,
            low_latency: true,
            generation,
        }
    }
}

/// Events delivered by a decoder back to the processing context
#[derive(Debug)]
pub enum DecoderEvent {
    /// `generation` is that of the configuration which produced the frame
    Frame { generation: u64, frame: VideoFrame },
    Error(String),
}

pub type DecoderOutput = mpsc::UnboundedSender<DecoderEvent>;

/// Platform decoder seam
#[async_trait]
pub trait VideoDecoder: Send {
    /// (Re)create the underlying decoder. Resolves once it can accept units.
    async fn configure(&mut self, config: &DecoderConfig) -> Result<()>;

    /// Submit one unit. Output frames are delivered on the decoder's output channel.
    fn decode(&mut self, unit: &EncodedUnit, kind: ChunkKind) -> Result<()>;

    /// Release the underlying decoder. Safe to call repeatedly.
    fn close(&mut self);

    fn name(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Everything a [`RecordingDecoder`] observed
    #[derive(Debug, Default)]
    pub(crate) struct DecoderLog {
        pub configured: Vec<DecoderConfig>,
        pub submitted: Vec<ChunkKind>,
        pub closes: usize,
    }

    /// Records calls and optionally answers every submission with a frame.
    pub(crate) struct RecordingDecoder {
        pub log: Arc<Mutex<DecoderLog>>,
        pub output: Option<DecoderOutput>,
        pub fail_configure: bool,
        pub notify: Option<mpsc::UnboundedSender<ChunkKind>>,
        generation: u64,
    }

    impl RecordingDecoder {
        pub(crate) fn new() -> (Self, Arc<Mutex<DecoderLog>>) {
            let log = Arc::new(Mutex::new(DecoderLog::default()));
            (
                Self {
                    log: Arc::clone(&log),
                    output: None,
                    fail_configure: false,
                    notify: None,
                    generation: 0,
                },
                log,
            )
        }
    }

    #[async_trait]
    impl VideoDecoder for RecordingDecoder {
        async fn configure(&mut self, config: &DecoderConfig) -> Result<()> {
            if self.fail_configure {
                return Err(crate::error::ViewerError::Configuration(
                    "unsupported".into(),
                ));
            }
            self.generation = config.generation;
            self.log.lock().unwrap().configured.push(config.clone());
            Ok(())
        }

        fn decode(&mut self, unit: &EncodedUnit, kind: ChunkKind) -> Result<()> {
            self.log.lock().unwrap().submitted.push(kind);
            if let Some(output) = &self.output {
                let _ = output.send(DecoderEvent::Frame {
                    generation: self.generation,
                    frame: VideoFrame {
                        data: Vec::new(),
                        width: 2,
                        height: 2,
                        timestamp: unit.timestamp,
                    },
                });
            }
            if let Some(notify) = &self.notify {
                let _ = notify.send(kind);
            }
            Ok(())
        }

        fn close(&mut self) {
            self.log.lock().unwrap().closes += 1;
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }
}

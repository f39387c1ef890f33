//! Keyframe gate in front of the video decoder
//!
//! Nothing reaches the decoder until a keyframe has been seen since the last
//! reset. Units arriving earlier are dropped and counted.

use log::{debug, info, warn};

use super::{ChunkKind, DecoderConfig, VideoDecoder};
use crate::error::{Result, ViewerError};
use crate::pipeline::types::{EncodedUnit, StreamConfig};

/// What happened to a submitted unit
#[derive(Debug)]
pub enum GateOutcome {
    /// Handed to the decoder with the given tag
    Submitted(ChunkKind),
    /// Discarded before the decoder saw it
    Dropped,
    /// The decoder refused the unit; the pipeline carries on
    Rejected(ViewerError),
}

pub struct DecodeGate {
    decoder: Box<dyn VideoDecoder>,
    config: Option<DecoderConfig>,
    generation: u64,
    latched: bool,
    first_frame_signaled: bool,
    units_submitted: u64,
    units_dropped: u64,
}

impl DecodeGate {
    pub fn new(decoder: Box<dyn VideoDecoder>) -> Self {
        Self {
            decoder,
            config: None,
            generation: 0,
            latched: false,
            first_frame_signaled: false,
            units_submitted: 0,
            units_dropped: 0,
        }
    }

    /// Release any live decoder and create a new one for `stream`.
    ///
    /// On failure the gate stays unconfigured and drops units until the next
    /// successful call.
    pub async fn configure(&mut self, stream: &StreamConfig) -> Result<()> {
        self.decoder.close();
        self.config = None;
        self.first_frame_signaled = false;

        self.generation += 1;
        let config = DecoderConfig::new(stream, self.generation);
        if let Err(e) = self.decoder.configure(&config).await {
            warn!("Decoder '{}' rejected {}: {}", self.decoder.name(), config.codec, e);
            return Err(match e {
                ViewerError::Configuration(_) => e,
                other => ViewerError::Configuration(other.to_string()),
            });
        }

        info!(
            "Decoder '{}' configured: {} {}x{}",
            self.decoder.name(),
            config.codec,
            config.coded_width,
            config.coded_height
        );
        self.config = Some(config);
        Ok(())
    }

    pub fn submit(&mut self, unit: EncodedUnit) -> GateOutcome {
        if self.config.is_none() {
            self.units_dropped += 1;
            debug!("Decoder not configured, dropping {} bytes", unit.size());
            return GateOutcome::Dropped;
        }

        if !self.latched {
            if !unit.is_keyframe {
                self.units_dropped += 1;
                return GateOutcome::Dropped;
            }
            debug!(
                "Keyframe received after {} dropped units, starting decode",
                self.units_dropped
            );
            self.latched = true;
        }

        let kind = if unit.is_keyframe {
            ChunkKind::Key
        } else {
            ChunkKind::Delta
        };

        self.units_submitted += 1;
        match self.decoder.decode(&unit, kind) {
            Ok(()) => GateOutcome::Submitted(kind),
            Err(e) => GateOutcome::Rejected(e),
        }
    }

    /// Whether a frame tagged `generation` came from the live decoder.
    pub fn is_current(&self, generation: u64) -> bool {
        self.config
            .as_ref()
            .is_some_and(|config| config.generation == generation)
    }

    /// Note a decoded frame. Returns true for the first one since configure.
    pub fn note_frame(&mut self) -> bool {
        if self.first_frame_signaled || self.config.is_none() {
            return false;
        }
        self.first_frame_signaled = true;
        true
    }

    /// Forget everything learned on the previous connection.
    pub fn reset(&mut self) {
        self.close();
        self.latched = false;
        self.units_submitted = 0;
        self.units_dropped = 0;
    }

    /// Release the decoder. Idempotent.
    pub fn close(&mut self) {
        self.decoder.close();
        self.config = None;
        self.first_frame_signaled = false;
    }

    #[cfg(test)]
    pub(crate) fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn units_submitted(&self) -> u64 {
        self.units_submitted
    }

    pub fn units_dropped(&self) -> u64 {
        self.units_dropped
    }
}

//! Core types for the ingestion pipeline

use bytes::Bytes;
use std::time::Instant;

/// Timestamp representation for media units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    /// Microseconds since the media clock base
    pub micros: i64,
}

impl Timestamp {
    /// Create a new timestamp from microseconds
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a timestamp from instant relative to base
    pub fn from_instant(instant: Instant, base: Instant) -> Self {
        let duration = instant.saturating_duration_since(base);
        Self::from_micros(duration.as_micros() as i64)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}µs", self.micros)
    }
}

/// One decodable access unit extracted from a media box
///
/// Produced once by the demuxer and consumed exactly once by the decode gate.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedUnit {
    /// Annex B payload, a zero-copy slice of the received fragment
    pub data: Bytes,

    /// Local monotonic time of extraction
    pub timestamp: Timestamp,

    /// Carries a parameter set or key picture
    pub is_keyframe: bool,
}

impl EncodedUnit {
    pub fn new(data: Bytes, timestamp: Timestamp, is_keyframe: bool) -> Self {
        Self {
            data,
            timestamp,
            is_keyframe,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for EncodedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedUnit")
            .field("timestamp", &self.timestamp)
            .field("is_keyframe", &self.is_keyframe)
            .field("size", &self.size())
            .finish()
    }
}

/// Stream parameters announced by an Init message
///
/// Replaced wholesale by every Init; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    /// Decoded avcC record. Kept for inspection only: the decoder reads
    /// parameter sets in-band from keyframes.
    pub description: Option<Bytes>,
}

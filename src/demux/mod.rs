//! Container demuxing
//!
//! Turns binary media messages into [`EncodedUnit`](crate::pipeline::types::EncodedUnit)s.

pub mod mp4;
pub mod nal;

pub use mp4::{BoxHeader, Demuxer};

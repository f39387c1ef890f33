//! Outward-facing surfaces: status callbacks and frame output

mod log_view;
mod sinks;

pub use log_view::LogView;
pub use sinks::{DiscardSink, YuvFileSink};

use crate::decoder::VideoFrame;
use crate::error::ViewerError;
use crate::pipeline::stats::StatsSnapshot;

/// Status callbacks. Invoked from the processing context only.
pub trait ViewEvents: Send {
    fn on_connect(&mut self);

    fn on_disconnect(&mut self);

    fn on_error(&mut self, error: &ViewerError);

    fn on_stats(&mut self, stats: &StatsSnapshot);

    /// First decoded frame since the decoder was configured
    fn on_first_frame(&mut self) {}
}

/// Destination for decoded frames
pub trait RenderSink: Send {
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, frame: VideoFrame);
}

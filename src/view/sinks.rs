//! Frame sinks for headless operation

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, error};

use super::RenderSink;
use crate::decoder::VideoFrame;
use crate::error::Result;

/// Counts frames and drops them
#[derive(Debug, Default)]
pub struct DiscardSink {
    frames: u64,
    size: (u32, u32),
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl RenderSink for DiscardSink {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn render(&mut self, _frame: VideoFrame) {
        self.frames += 1;
    }
}

/// Appends raw YUV 4:2:0 frames to a file, playable with
/// `ffplay -f rawvideo -pixel_format yuv420p -video_size WxH`.
///
/// A write failure disables the sink rather than stopping playback.
pub struct YuvFileSink<W: Write + Send = BufWriter<File>> {
    writer: Option<W>,
    size: (u32, u32),
}

impl YuvFileSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write + Send> YuvFileSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Some(writer),
            size: (0, 0),
        }
    }

    pub fn into_inner(mut self) -> Option<W> {
        self.writer.take()
    }
}

impl<W: Write + Send> RenderSink for YuvFileSink<W> {
    fn resize(&mut self, width: u32, height: u32) {
        if self.size != (width, height) {
            debug!("Dump size is now {}x{}", width, height);
        }
        self.size = (width, height);
    }

    fn render(&mut self, frame: VideoFrame) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_all(&frame.data) {
            error!("Frame dump disabled: {}", e);
            self.writer = None;
        }
    }
}

impl<W: Write + Send> Drop for YuvFileSink<W> {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

//! FFmpeg-backed [`VideoDecoder`]

use ac_ffmpeg::codec::Decoder;
use ac_ffmpeg::codec::video::{self, VideoFrame as FfmpegFrame};
use ac_ffmpeg::packet::PacketMut;
use ac_ffmpeg::time::{TimeBase, Timestamp as FfmpegTimestamp};
use async_trait::async_trait;
use log::{debug, warn};

use super::{
    ChunkKind, CodecFamily, DecoderConfig, DecoderEvent, DecoderOutput, VideoDecoder, VideoFrame,
};
use crate::error::{Result, ViewerError};
use crate::pipeline::types::{EncodedUnit, Timestamp};

/// Unit timestamps are in microseconds, so the decoder runs on the same base.
const MICROS: TimeBase = TimeBase::new(1, 1_000_000);

/// Software/hardware H.264 and HEVC decoding through libavcodec.
///
/// Frames are unpacked to contiguous YUV 4:2:0 and pushed to the output
/// channel as soon as `take()` yields them.
pub struct FfmpegDecoder {
    decoder: Option<video::VideoDecoder>,
    generation: u64,
    output: DecoderOutput,
}

unsafe impl Send for FfmpegDecoder {}

impl FfmpegDecoder {
    pub fn new(output: DecoderOutput) -> Self {
        Self {
            decoder: None,
            generation: 0,
            output,
        }
    }

    fn drain(&mut self, fallback_ts: Timestamp) -> Result<()> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(());
        };

        loop {
            match decoder.take() {
                Ok(Some(frame)) => {
                    let timestamp = frame
                        .pts()
                        .as_micros()
                        .map(Timestamp::from_micros)
                        .unwrap_or(fallback_ts);
                    let Some(packed) = pack_frame(&frame, timestamp) else {
                        let _ = self.output.send(DecoderEvent::Error(format!(
                            "unsupported frame layout ({} planes)",
                            frame.planes().len()
                        )));
                        continue;
                    };
                    let event = DecoderEvent::Frame {
                        generation: self.generation,
                        frame: packed,
                    };
                    if self.output.send(event).is_err() {
                        debug!("Frame receiver gone, discarding output");
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    let _ = self.output.send(DecoderEvent::Error(e.to_string()));
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn configure(&mut self, config: &DecoderConfig) -> Result<()> {
        let family = CodecFamily::from_codec(&config.codec)?;

        let mut builder = video::VideoDecoder::builder(family.decoder_name())
            .map_err(|e| ViewerError::Configuration(format!("{}: {}", config.codec, e)))?
            .time_base(MICROS);
        if config.low_latency {
            builder = builder.set_option("flags", "low_delay");
        }

        let decoder = builder
            .build()
            .map_err(|e| ViewerError::Configuration(format!("{}: {}", config.codec, e)))?;

        self.decoder = Some(decoder);
        self.generation = config.generation;
        Ok(())
    }

    fn decode(&mut self, unit: &EncodedUnit, kind: ChunkKind) -> Result<()> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| ViewerError::Decode("decoder is closed".into()))?;

        let packet = PacketMut::from(&unit.data[..])
            .with_pts(FfmpegTimestamp::new(unit.timestamp.micros, MICROS))
            .freeze();

        decoder.try_push(packet).map_err(|e| {
            warn!("Decoder refused {} unit of {} bytes: {}", kind, unit.size(), e);
            ViewerError::Decode(e.to_string())
        })?;

        self.drain(unit.timestamp)
    }

    fn close(&mut self) {
        self.decoder = None;
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Strip stride padding and lay the three planes out back to back.
fn pack_frame(frame: &FfmpegFrame, timestamp: Timestamp) -> Option<VideoFrame> {
    let planes = frame.planes();
    if planes.len() < 3 {
        return None;
    }

    let (width, height) = (frame.width(), frame.height());
    let (chroma_w, chroma_h) = (width / 2, height / 2);
    let mut data = Vec::with_capacity(width * height + chroma_w * chroma_h * 2);

    copy_plane(&mut data, planes[0].data(), planes[0].line_size(), width, height);
    copy_plane(&mut data, planes[1].data(), planes[1].line_size(), chroma_w, chroma_h);
    copy_plane(&mut data, planes[2].data(), planes[2].line_size(), chroma_w, chroma_h);

    Some(VideoFrame {
        data,
        width: width as u32,
        height: height as u32,
        timestamp,
    })
}

#[inline]
fn copy_plane(dst: &mut Vec<u8>, src: &[u8], stride: usize, width: usize, height: usize) {
    if stride == width && src.len() >= width * height {
        dst.extend_from_slice(&src[..width * height]);
        return;
    }

    for row in src.chunks(stride.max(1)).take(height) {
        let Some(visible) = row.get(..width) else {
            break;
        };
        dst.extend_from_slice(visible);
    }
}

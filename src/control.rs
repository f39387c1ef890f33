//! Dispatch of server control messages
//!
//! The handler turns each [`ServerMessage`] into a [`ControlAction`] for the
//! coordinator, which owns the decoder, the render sink and the connection.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use log::{debug, info, warn};

use crate::assets::FALLBACK_CODEC;
use crate::error::ViewerError;
use crate::pipeline::clock::latency_sample_ms;
use crate::pipeline::stats::StatsAggregator;
use crate::pipeline::types::StreamConfig;
use crate::protocol::{ClientMessage, ServerMessage};

#[derive(Debug)]
pub enum ControlAction {
    /// Resize the sink and (re)configure the decoder
    Configure(StreamConfig),
    /// Send back to the server
    Reply(ClientMessage),
    /// Surface to the view
    Report(ViewerError),
    None,
}

/// Stateless: the stream parameters live with the coordinator's decode gate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ControlHandler;

impl ControlHandler {
    /// `local_ms` is our wall clock at receipt, used for Ping latency.
    pub fn handle(
        &self,
        message: ServerMessage,
        stats: &mut StatsAggregator,
        local_ms: u64,
    ) -> ControlAction {
        match message {
            ServerMessage::Init {
                width,
                height,
                fps,
                codec,
                codec_data,
            } => {
                let codec = codec.unwrap_or_else(|| FALLBACK_CODEC.to_string());
                let description = match codec_data.as_deref().map(|data| STANDARD.decode(data)) {
                    Some(Ok(decoded)) => Some(Bytes::from(decoded)),
                    Some(Err(e)) => {
                        // Not fatal: parameter sets also arrive in-band
                        warn!("Ignoring undecodable codec_data: {}", e);
                        None
                    }
                    None => None,
                };

                info!("Stream init: {}x{} @ {}fps, codec {}", width, height, fps, codec);
                ControlAction::Configure(StreamConfig {
                    width,
                    height,
                    fps,
                    codec,
                    description,
                })
            }
            ServerMessage::Ready => {
                debug!("Server ready");
                ControlAction::None
            }
            ServerMessage::Ping { timestamp } => {
                stats.record_latency_sample(latency_sample_ms(local_ms, timestamp));
                ControlAction::Reply(ClientMessage::Pong { timestamp })
            }
            ServerMessage::Error { message } => {
                warn!("Server error: {}", message);
                ControlAction::Report(ViewerError::Server(message))
            }
            ServerMessage::Unknown => {
                debug!("Ignoring unknown control message");
                ControlAction::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn handle(handler: &ControlHandler, stats: &mut StatsAggregator, text: &str) -> ControlAction {
        handler.handle(ServerMessage::parse(text).unwrap(), stats, 1_000_050)
    }

    #[test]
    fn test_init_builds_stream_config() {
        let handler = ControlHandler;
        let mut stats = StatsAggregator::new();

        let action = handle(
            &handler,
            &mut stats,
            r#"{"type":"Init","width":1280,"height":720,"fps":60,"codec":"hvc1.1.6.L93.B0","codec_data":"AWQAKv/h"}"#,
        );

        let ControlAction::Configure(config) = action else {
            panic!("expected Configure, got {action:?}");
        };
        assert_eq!((config.width, config.height, config.fps), (1280, 720, 60));
        assert_eq!(config.codec, "hvc1.1.6.L93.B0");
        assert_eq!(
            config.description.as_deref(),
            Some(&[0x01, 0x64, 0x00, 0x2a, 0xff, 0xe1][..])
        );
    }

    #[test]
    fn test_init_falls_back_to_default_codec() {
        let handler = ControlHandler;
        let mut stats = StatsAggregator::new();

        let action = handle(
            &handler,
            &mut stats,
            r#"{"type":"Init","width":1920,"height":1080,"fps":30,"codec_data":"%%%"}"#,
        );
        let ControlAction::Configure(config) = action else {
            panic!("expected Configure, got {action:?}");
        };
        assert_eq!(config.codec, FALLBACK_CODEC);
        assert!(config.description.is_none());
    }

    #[test]
    fn test_ping_records_latency_and_replies() {
        let handler = ControlHandler;
        let mut stats = StatsAggregator::new();

        let action = handle(
            &handler,
            &mut stats,
            r#"{"type":"Ping","timestamp":1000000}"#,
        );
        assert!(matches!(
            action,
            ControlAction::Reply(ClientMessage::Pong { timestamp: 1_000_000 })
        ));

        let snapshot = stats.tick(Instant::now(), 0, 0);
        assert_eq!(snapshot.latency_ms, 50.0);
    }

    #[test]
    fn test_error_and_unknown() {
        let handler = ControlHandler;
        let mut stats = StatsAggregator::new();

        let action = handle(&handler, &mut stats, r#"{"type":"Error","message":"busy"}"#);
        assert!(matches!(action, ControlAction::Report(ViewerError::Server(m)) if m == "busy"));

        assert!(matches!(
            handle(&handler, &mut stats, r#"{"type":"Ready"}"#),
            ControlAction::None
        ));
        assert!(matches!(
            handle(&handler, &mut stats, r#"{"type":"Bitrate","value":3}"#),
            ControlAction::None
        ));
    }
}

//! Control messages exchanged on the text side of the connection

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

/// Server-to-client control messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Stream configuration; (re)creates the decoder
    Init {
        width: u32,
        height: u32,
        fps: u32,
        /// WebCodecs-style codec string (e.g., "avc1.64002a")
        #[serde(default, skip_serializing_if = "Option::is_none")]
        codec: Option<String>,
        /// Base64-encoded avcC record
        #[serde(default, skip_serializing_if = "Option::is_none")]
        codec_data: Option<String>,
    },
    /// Server is ready to stream
    Ready,
    /// Latency probe, `timestamp` is the server's wall clock in milliseconds
    Ping { timestamp: u64 },
    /// Error reported by the server
    Error { message: String },
    /// Any tag this client does not know about
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parse a text payload.
    ///
    /// Unknown `type` tags parse to [`ServerMessage::Unknown`]; a payload that is
    /// not a tagged object, or a known tag with missing fields, is a protocol error.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ViewerError::Protocol(format!("{e}: {text}")))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Init { .. } => "Init",
            ServerMessage::Ready => "Ready",
            ServerMessage::Ping { .. } => "Ping",
            ServerMessage::Error { .. } => "Error",
            ServerMessage::Unknown => "Unknown",
        }
    }
}

/// Client-to-server control messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Echo of a received Ping
    Pong { timestamp: u64 },
}

impl ClientMessage {
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_init() {
        let msg = ServerMessage::parse(
            r#"{"type":"Init","width":1280,"height":720,"fps":60,"codec":"avc1.64002a","codec_data":"AWQAKv/h"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::Init {
                width: 1280,
                height: 720,
                fps: 60,
                codec: Some("avc1.64002a".into()),
                codec_data: Some("AWQAKv/h".into()),
            }
        );
    }

    #[test]
    fn test_parse_init_without_codec() {
        let msg = ServerMessage::parse(r#"{"type":"Init","width":1920,"height":1080,"fps":30}"#)
            .unwrap();
        match msg {
            ServerMessage::Init {
                codec, codec_data, ..
            } => {
                assert!(codec.is_none());
                assert!(codec_data.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_kinds() {
        assert_eq!(
            ServerMessage::parse(r#"{"type":"Ready"}"#).unwrap(),
            ServerMessage::Ready
        );
        assert_eq!(
            ServerMessage::parse(r#"{"type":"Ping","timestamp":1700000000000}"#).unwrap(),
            ServerMessage::Ping {
                timestamp: 1_700_000_000_000
            }
        );
        assert_eq!(
            ServerMessage::parse(r#"{"type":"Error","message":"encoder stopped"}"#).unwrap(),
            ServerMessage::Error {
                message: "encoder stopped".into()
            }
        );
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let msg = ServerMessage::parse(r#"{"type":"SetQuality","bitrate":4000}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
        assert_eq!(msg.kind(), "Unknown");
    }

    #[test]
    fn test_malformed_is_protocol_error() {
        assert!(matches!(
            ServerMessage::parse("not json"),
            Err(ViewerError::Protocol(_))
        ));
        assert!(matches!(
            ServerMessage::parse(r#"{"type":"Ping"}"#),
            Err(ViewerError::Protocol(_))
        ));
    }

    #[test]
    fn test_pong_wire_format() {
        let text = ClientMessage::Pong { timestamp: 42 }.to_text().unwrap();
        assert_eq!(text, r#"{"type":"Pong","timestamp":42}"#);
    }
}

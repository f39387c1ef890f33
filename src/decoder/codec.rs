//! Codec string parsing (`avc1.PPCCLL`, `hvc1.…`)

use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecFamily {
    #[default]
    H264,
    Hevc,
}

impl CodecFamily {
    /// Family named by a WebCodecs-style codec string.
    ///
    /// An `avc1`/`avc3` suffix must be the six hex digits of profile,
    /// constraint flags and level.
    pub fn from_codec(codec: &str) -> Result<Self> {
        let (fourcc, rest) = match codec.split_once('.') {
            Some((fourcc, rest)) => (fourcc, Some(rest)),
            None => (codec, None),
        };

        match fourcc {
            "avc1" | "avc3" => {
                if rest.is_some_and(|hex| !is_avc_profile(hex)) {
                    return Err(ViewerError::Configuration(format!(
                        "Invalid AVC codec string: {codec}"
                    )));
                }
                Ok(CodecFamily::H264)
            }
            "hvc1" | "hev1" => Ok(CodecFamily::Hevc),
            _ => Err(ViewerError::Configuration(format!(
                "Unsupported codec: {codec}"
            ))),
        }
    }

    /// FFmpeg decoder name for this family
    pub fn decoder_name(&self) -> &'static str {
        match self {
            CodecFamily::H264 => "h264",
            CodecFamily::Hevc => "hevc",
        }
    }

    /// NAL unit type carried in the first header byte
    pub fn nal_type(&self, header: u8) -> u8 {
        match self {
            CodecFamily::H264 => header & 0x1F,
            CodecFamily::Hevc => (header >> 1) & 0x3F,
        }
    }
}

fn is_avc_profile(hex: &str) -> bool {
    hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_avc() {
        let family = CodecFamily::from_codec("avc1.64002a").unwrap();
        assert_eq!(family, CodecFamily::H264);
        assert_eq!(family.decoder_name(), "h264");
        assert_eq!(CodecFamily::from_codec("avc3").unwrap(), CodecFamily::H264);
    }

    #[test]
    fn test_parse_hevc() {
        let family = CodecFamily::from_codec("hvc1.1.6.L93.B0").unwrap();
        assert_eq!(family, CodecFamily::Hevc);
        assert_eq!(family.decoder_name(), "hevc");
        assert_eq!(CodecFamily::from_codec("hev1").unwrap(), CodecFamily::Hevc);
    }

    #[test]
    fn test_reject_invalid() {
        assert!(matches!(
            CodecFamily::from_codec("vp09.00.10.08"),
            Err(ViewerError::Configuration(_))
        ));
        assert!(CodecFamily::from_codec("avc1.64zz2a").is_err());
        assert!(CodecFamily::from_codec("avc1.6400").is_err());
    }

    #[test]
    fn test_nal_type_per_family() {
        // 0x65: H.264 IDR slice
        assert_eq!(CodecFamily::H264.nal_type(0x65), 5);
        // 0x40 0x01: HEVC VPS, 0x26 0x01: HEVC IDR_W_RADL
        assert_eq!(CodecFamily::Hevc.nal_type(0x40), 32);
        assert_eq!(CodecFamily::Hevc.nal_type(0x26), 19);
    }
}

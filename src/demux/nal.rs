//! Annex B start-code scanning
//!
//! Keyframe detection is a heuristic on the raw elementary stream: an access
//! unit counts as a keyframe as soon as a start-code-prefixed NAL header
//! carries a parameter set or a random-access picture of the active codec.

use crate::assets::{
    HEVC_NAL_CRA, HEVC_NAL_IDR_N_LP, HEVC_NAL_IDR_W_RADL, HEVC_NAL_SPS, HEVC_NAL_VPS, NAL_IDR,
    NAL_SPS,
};
use crate::decoder::CodecFamily;

/// Iterator over the first NAL header byte found after each start code.
///
/// Both the 3-byte (`00 00 01`) and 4-byte (`00 00 00 01`) forms match, the
/// latter because it ends in the former.
pub struct NalHeaders<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> NalHeaders<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl Iterator for NalHeaders<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        while self.pos + 3 < self.data.len() {
            let i = self.pos;
            if self.data.get(i..i + 3) == Some(&[0, 0, 1][..]) {
                let header = self.data.get(i + 3).copied()?;
                self.pos = i + 4;
                return Some(header);
            }
            self.pos += 1;
        }
        None
    }
}

/// True when the access unit can start decoding for `family`.
///
/// H.264: SPS or IDR slice. HEVC: VPS, SPS, IDR or CRA picture.
pub fn is_keyframe(data: &[u8], family: CodecFamily) -> bool {
    NalHeaders::new(data)
        .map(|header| family.nal_type(header))
        .any(|nal_type| match family {
            CodecFamily::H264 => nal_type == NAL_SPS || nal_type == NAL_IDR,
            CodecFamily::Hevc => matches!(
                nal_type,
                HEVC_NAL_VPS
                    | HEVC_NAL_SPS
                    | HEVC_NAL_IDR_W_RADL
                    | HEVC_NAL_IDR_N_LP
                    | HEVC_NAL_CRA
            ),
        })
}

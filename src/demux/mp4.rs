//! Box scanner for fragmented MP4 media messages
//!
//! Each binary message holds zero or more complete boxes:
//! `[u32 BE size incl. header][4-byte type][payload]`. Only the media-payload
//! box yields an access unit; every other box is skipped by its declared size.
//!
//! A box that does not fit in the remaining bytes ends the scan and is
//! discarded. Nothing is carried over to the next message, so a server that
//! splits a box across messages loses that unit.

use bytes::Bytes;
use log::debug;

use super::nal;
use crate::assets::{BOX_HEADER_LEN, MEDIA_BOX_TAG};
use crate::decoder::CodecFamily;
use crate::pipeline::clock::MediaClock;
use crate::pipeline::types::{EncodedUnit, Timestamp};

/// Header of one box inside a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub size: usize,
    pub tag: [u8; 4],
}

impl BoxHeader {
    /// Read the header at the start of `buf`.
    ///
    /// Returns `None` when fewer than 8 bytes remain, the declared size is
    /// smaller than the header, or it runs past the end of `buf`.
    pub fn read(buf: &[u8]) -> Option<Self> {
        let size_bytes: [u8; 4] = buf.get(0..4)?.try_into().ok()?;
        let tag: [u8; 4] = buf.get(4..BOX_HEADER_LEN)?.try_into().ok()?;
        let size = u32::from_be_bytes(size_bytes) as usize;

        if size < BOX_HEADER_LEN || size > buf.len() {
            return None;
        }
        Some(Self { size, tag })
    }
}

/// Splits received fragments into encoded units
#[derive(Debug, Clone)]
pub struct Demuxer {
    clock: MediaClock,
    media_tag: [u8; 4],
    family: CodecFamily,
}

impl Demuxer {
    pub fn new(clock: MediaClock) -> Self {
        Self {
            clock,
            media_tag: MEDIA_BOX_TAG,
            family: CodecFamily::default(),
        }
    }

    /// Keyframes are classified by the NAL types of the announced codec.
    pub fn set_family(&mut self, family: CodecFamily) {
        self.family = family;
    }

    /// Extract the access units of one fragment, in arrival order.
    ///
    /// Each unit is stamped with the local clock at extraction time.
    pub fn demux(&self, fragment: &Bytes) -> Vec<EncodedUnit> {
        let clock = self.clock;
        demux_with(fragment, self.media_tag, self.family, || clock.now())
    }
}

/// Scan `fragment` for boxes tagged `media_tag`.
///
/// `stamp` is called once per extracted unit.
pub fn demux_with<F>(
    fragment: &Bytes,
    media_tag: [u8; 4],
    family: CodecFamily,
    mut stamp: F,
) -> Vec<EncodedUnit>
where
    F: FnMut() -> Timestamp,
{
    let mut units = Vec::new();
    let mut offset = 0usize;

    while offset < fragment.len() {
        let Some(header) = fragment.get(offset..).and_then(BoxHeader::read) else {
            debug!(
                "Demuxer: discarding {} trailing bytes of a partial box",
                fragment.len() - offset
            );
            break;
        };

        if header.tag == media_tag {
            let payload = fragment.slice(offset + BOX_HEADER_LEN..offset + header.size);
            let is_keyframe = nal::is_keyframe(&payload, family);
            units.push(EncodedUnit::new(payload, stamp(), is_keyframe));
        }

        offset += header.size;
    }

    units
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_box(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(BOX_HEADER_LEN + payload.len());
        out.extend_from_slice(&((BOX_HEADER_LEN + payload.len()) as u32).to_be_bytes());
        out.extend_from_slice(tag);
        out.extend_from_slice(payload);
        out
    }

    fn demux(fragment: &[u8]) -> Vec<EncodedUnit> {
        demux_with(
            &Bytes::copy_from_slice(fragment),
            MEDIA_BOX_TAG,
            CodecFamily::H264,
            || Timestamp::from_micros(0),
        )
    }

    const KEY: &[u8] = &[0, 0, 0, 1, 0x67, 0x64, 0x00, 0x2a];
    const DELTA: &[u8] = &[0, 0, 0, 1, 0x41, 0x9a];

    #[test]
    fn test_short_fragment_yields_nothing() {
        assert!(demux(&[]).is_empty());
        assert!(demux(&[0, 0, 0, 16, b'm', b'd', b'a']).is_empty());
    }

    #[test]
    fn test_declared_size_beyond_buffer() {
        let mut fragment = make_box(b"mdat", KEY);
        fragment.truncate(fragment.len() - 1);
        assert!(demux(&fragment).is_empty());
    }

    #[test]
    fn test_declared_size_below_header() {
        let mut fragment = vec![0, 0, 0, 4];
        fragment.extend_from_slice(b"mdat");
        fragment.extend_from_slice(KEY);
        assert!(demux(&fragment).is_empty());
    }

    #[test]
    fn test_skips_other_boxes() {
        let mut fragment = make_box(b"moof", &[0xAA; 24]);
        fragment.extend(make_box(b"mdat", KEY));

        let units = demux(&fragment);
        assert_eq!(units.len(), 1);
        assert_eq!(&units[0].data[..], KEY);
        assert!(units[0].is_keyframe);
    }

    #[test]
    fn test_arrival_order_and_classification() {
        let mut fragment = make_box(b"mdat", DELTA);
        fragment.extend(make_box(b"free", &[]));
        fragment.extend(make_box(b"mdat", KEY));
        fragment.extend(make_box(b"mdat", DELTA));

        let flags: Vec<bool> = demux(&fragment).iter().map(|u| u.is_keyframe).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_trailing_partial_box_discarded() {
        let mut fragment = make_box(b"mdat", KEY);
        let partial = make_box(b"mdat", DELTA);
        fragment.extend_from_slice(&partial[..partial.len() - 2]);

        let units = demux(&fragment);
        assert_eq!(units.len(), 1);
        assert!(units[0].is_keyframe);
    }

    #[test]
    fn test_empty_media_box() {
        let units = demux(&make_box(b"mdat", &[]));
        assert_eq!(units.len(), 1);
        assert!(units[0].data.is_empty());
        assert!(!units[0].is_keyframe);
    }

    #[test]
    fn test_identical_input_identical_output() {
        let mut fragment = make_box(b"moof", &[1, 2, 3]);
        fragment.extend(make_box(b"mdat", KEY));
        fragment.extend(make_box(b"mdat", DELTA));

        assert_eq!(demux(&fragment), demux(&fragment));
    }

    #[test]
    fn test_units_stamped_in_order() {
        let mut fragment = make_box(b"mdat", KEY);
        fragment.extend(make_box(b"mdat", DELTA));

        let mut next = 0;
        let units = demux_with(
            &Bytes::from(fragment),
            MEDIA_BOX_TAG,
            CodecFamily::H264,
            || {
                next += 10;
                Timestamp::from_micros(next)
            },
        );
        assert_eq!(units[0].timestamp.micros, 10);
        assert_eq!(units[1].timestamp.micros, 20);
    }

    #[test]
    fn test_demuxer_follows_codec_family() {
        // HEVC VPS followed by an HEVC trailing picture
        let mut fragment = make_box(b"mdat", &[0, 0, 0, 1, 0x40, 0x01, 0x0c]);
        fragment.extend(make_box(b"mdat", &[0, 0, 0, 1, 0x02, 0x01, 0xd0]));
        let fragment = Bytes::from(fragment);

        let mut demuxer = Demuxer::new(MediaClock::new());
        let flags =
            |units: Vec<EncodedUnit>| units.iter().map(|u| u.is_keyframe).collect::<Vec<_>>();
        assert_eq!(flags(demuxer.demux(&fragment)), vec![false, false]);

        demuxer.set_family(CodecFamily::Hevc);
        assert_eq!(flags(demuxer.demux(&fragment)), vec![true, false]);
    }
}

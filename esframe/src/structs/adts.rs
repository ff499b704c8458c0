//! AAC ADTS frame headers.
//!
//! ADTS frames start with a 12-bit sync word followed by fixed-layout
//! header fields. The 13-bit frame-length field counts the header itself,
//! so each header locates the next frame directly; no other field has to
//! be validated to walk the stream.

/// ADTS header length in bytes (the CRC-protected form).
pub const HEADER_LEN: usize = 9;

/// Magic prefix of an ADIF container, which carries a single global header
/// instead of per-frame framing and cannot be streamed.
pub const ADIF_MAGIC: &[u8; 4] = b"ADIF";

// The frame-length field counts the 7-byte fixed header, so anything
// smaller cannot delimit a frame.
const MIN_FRAME_LEN: usize = 7;

/// A validated ADTS frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// Total frame length in bytes, header included.
    pub frame_size: usize,
}

impl AdtsHeader {
    /// Tests the sync word: 12 one-bits followed by the layer bits `00`.
    pub fn sync_matches(buf: &[u8]) -> bool {
        buf.len() >= 2 && buf[0] == 0xFF && buf[1] & 0xF6 == 0xF0
    }

    /// Reads the header at the start of `buf`.
    ///
    /// Returns `None` when the buffer is too short, the sync word does not
    /// match, or the frame-length field is smaller than the header it
    /// counts.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN || !Self::sync_matches(buf) {
            return None;
        }

        let frame_size =
            ((buf[3] & 0x03) as usize) << 11 | (buf[4] as usize) << 3 | (buf[5] as usize) >> 5;
        if frame_size < MIN_FRAME_LEN {
            return None;
        }

        Some(Self { frame_size })
    }
}

#[test]
fn parse_frame_length() {
    // frame_length = 200, spread over bytes 3..=5.
    let buf = [0xFF, 0xF1, 0x50, 0x80, 0x19, 0x00, 0x1F, 0xFC, 0x00];
    assert_eq!(AdtsHeader::parse(&buf), Some(AdtsHeader { frame_size: 200 }));

    // Maximum 13-bit length.
    let buf = [0xFF, 0xF1, 0x50, 0x83, 0xFF, 0xE0, 0x1F, 0xFC, 0x00];
    assert_eq!(AdtsHeader::parse(&buf), Some(AdtsHeader { frame_size: 8191 }));
}

#[test]
fn crc_absent_variant_syncs() {
    let buf = [0xFF, 0xF9, 0x50, 0x80, 0x19, 0x00, 0x1F, 0xFC, 0x00];
    assert!(AdtsHeader::sync_matches(&buf));
    assert_eq!(AdtsHeader::parse(&buf), Some(AdtsHeader { frame_size: 200 }));
}

#[test]
fn reject_bad_sync_and_degenerate_length() {
    assert!(!AdtsHeader::sync_matches(&[0xFF, 0xE0]));
    assert!(!AdtsHeader::sync_matches(&[0xFE, 0xF1]));
    // Layer bits set.
    assert!(!AdtsHeader::sync_matches(&[0xFF, 0xF2]));

    // frame_length shorter than the header itself.
    let buf = [0xFF, 0xF1, 0x50, 0x80, 0x00, 0x40, 0x1F, 0xFC, 0x00];
    assert_eq!(AdtsHeader::parse(&buf), None);

    // Too short a buffer.
    assert_eq!(AdtsHeader::parse(&[0xFF, 0xF1, 0x50]), None);
}

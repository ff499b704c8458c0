//! ID3v2 tag detection and skipping.
//!
//! MP3 files routinely carry one or more ID3v2 tags before the first audio
//! frame. Only the 10-byte tag header matters here: it announces the tag
//! payload length as a syncsafe integer, which is enough to skip the whole
//! tag without parsing any of it.

/// Length of the ID3v2 tag header in bytes.
pub const TAG_HEADER_LEN: usize = 10;

/// Decodes a 28-bit syncsafe integer: four bytes with the top bit of each
/// byte zeroed, big-endian.
pub fn syncsafe_u28(bytes: [u8; 4]) -> u32 {
    u32::from(bytes[0] & 0x7F) << 21
        | u32::from(bytes[1] & 0x7F) << 14
        | u32::from(bytes[2] & 0x7F) << 7
        | u32::from(bytes[3] & 0x7F)
}

/// Total bytes occupied by the tag starting at `buf`, header included, or
/// `None` when `buf` does not start with an ID3v2 tag.
pub fn tag_len(buf: &[u8; TAG_HEADER_LEN]) -> Option<usize> {
    if &buf[..3] != b"ID3" {
        return None;
    }
    let payload = syncsafe_u28([buf[6], buf[7], buf[8], buf[9]]);
    Some(payload as usize + TAG_HEADER_LEN)
}

#[test]
fn syncsafe_decoding() {
    assert_eq!(syncsafe_u28([0x00, 0x00, 0x00, 0x20]), 32);
    assert_eq!(syncsafe_u28([0x01, 0x7F, 0x7F, 0x7F]), 0x3F_FFFF);
    // The top bit of every byte is ignored.
    assert_eq!(syncsafe_u28([0x80, 0x80, 0x80, 0xA0]), 32);
}

#[test]
fn tag_length_includes_header() {
    let tag = *b"ID3\x04\x00\x00\x00\x00\x00\x20";
    assert_eq!(tag_len(&tag), Some(42));

    let not_a_tag = *b"LAME......";
    assert_eq!(tag_len(&not_a_tag), None);
}

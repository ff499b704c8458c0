//! Frame synchronization over raw stream bytes.
//!
//! Finding a frame boundary in the middle of arbitrary data is a search
//! problem: any byte pair can look like a sync word. A candidate header is
//! only trusted once [`FRAME_MATCH_REQUIRED`] successor headers, located
//! by walking the candidate's own frame-size chain, also check out. When a
//! candidate fails, scanning resumes at the very next byte: the claimed
//! frame size came from an unverified header and must not be used to skip
//! ahead, or a genuine frame overlapping the impostor would be missed.

use log::{debug, trace};

use crate::stream::StreamReader;
use crate::structs::adts::{self, AdtsHeader};
use crate::structs::id3;
use crate::structs::mp3::{self, Mp3Header};
use crate::utils::errors::SyncError;

/// Bytes fetched per refill of the scan window.
pub const RESYNC_READ_BYTES: usize = 1024;

/// Upper bound on how far a single resync may scan.
pub const RESYNC_MAX_CHECK_BYTES: u64 = 8 * 1024;

/// Successor headers that must agree before a candidate is accepted.
pub const FRAME_MATCH_REQUIRED: usize = 2;

/// A confirmed MP3 frame boundary.
#[derive(Debug, Clone, Copy)]
pub struct SyncPoint {
    /// Absolute offset of the frame header.
    pub pos: u64,
    /// The raw 32-bit header found there.
    pub header: u32,
}

/// Rolling window over the scan range. Refills keep the unconsumed tail,
/// so the scanner always sees its full lookahead, and advancing is
/// strictly one byte at a time.
struct ScanWindow {
    buf: [u8; RESYNC_READ_BYTES],
    start: usize,
    avail: usize,
    /// Absolute stream offset of `buf[start]`.
    pos: u64,
    eos: bool,
}

impl ScanWindow {
    fn new(pos: u64) -> Self {
        Self {
            buf: [0; RESYNC_READ_BYTES],
            start: 0,
            avail: 0,
            pos,
            eos: false,
        }
    }

    /// Makes at least `lookahead` bytes visible, refilling from the stream
    /// as needed. `false` once the stream cannot supply them.
    fn ensure(&mut self, stream: &mut StreamReader, lookahead: usize) -> bool {
        while self.avail < lookahead {
            if self.eos {
                return false;
            }
            self.buf.copy_within(self.start..self.start + self.avail, 0);
            self.start = 0;
            let got = stream.read_at(self.pos + self.avail as u64, &mut self.buf[self.avail..]);
            if got < RESYNC_READ_BYTES - self.avail {
                self.eos = true;
            }
            self.avail += got;
        }
        true
    }

    fn bytes(&self) -> &[u8] {
        &self.buf[self.start..self.start + self.avail]
    }

    fn advance(&mut self) {
        self.start += 1;
        self.avail -= 1;
        self.pos += 1;
    }
}

/// Locates the next confirmed MP3 frame at or after `pos`.
///
/// With a non-zero `match_header`, only candidates agreeing with it under
/// [`mp3::FIXED_HEADER_MASK`] are considered, biasing recovery toward the
/// stream that was already locked. Starting at offset 0 first skips any
/// ID3v2 tags, tolerating several tags in a row.
pub fn resync_mp3(
    stream: &mut StreamReader,
    match_header: u32,
    mut pos: u64,
) -> Result<SyncPoint, SyncError> {
    if pos == 0 {
        pos = skip_id3_tags(stream)?;
    }

    let start = pos;
    let mut window = ScanWindow::new(pos);

    loop {
        if window.pos >= start + RESYNC_MAX_CHECK_BYTES {
            return Err(SyncError::Exhausted {
                start,
                limit: RESYNC_MAX_CHECK_BYTES,
            });
        }
        if !window.ensure(stream, mp3::HEADER_LEN) {
            return Err(SyncError::ShortRead);
        }

        let b = window.bytes();
        let header = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);

        if match_header != 0 && (header ^ match_header) & mp3::FIXED_HEADER_MASK != 0 {
            window.advance();
            continue;
        }

        let Ok(parsed) = Mp3Header::parse(header) else {
            window.advance();
            continue;
        };

        trace!(
            "candidate header {header:#010X} at {}, frame size {}",
            window.pos, parsed.frame_size
        );

        if confirm_mp3(stream, window.pos + parsed.frame_size as u64, header) {
            debug!("locked MP3 frame at {}", window.pos);
            return Ok(SyncPoint {
                pos: window.pos,
                header,
            });
        }

        window.advance();
    }
}

/// Checks that a candidate's frame-size chain lands on further agreeing
/// headers. Reads are positional and never release ring bytes, so a failed
/// chain can be backtracked byte by byte.
fn confirm_mp3(stream: &mut StreamReader, mut test_pos: u64, candidate: u32) -> bool {
    for _ in 0..FRAME_MATCH_REQUIRED {
        let mut raw = [0u8; mp3::HEADER_LEN];
        if stream.read_at(test_pos, &mut raw) < raw.len() {
            return false;
        }
        let header = u32::from_be_bytes(raw);

        if (header ^ candidate) & mp3::FIXED_HEADER_MASK != 0 {
            trace!("successor at {test_pos} disagrees with candidate");
            return false;
        }
        let Ok(parsed) = Mp3Header::parse(header) else {
            return false;
        };

        test_pos += parsed.frame_size as u64;
    }
    true
}

fn skip_id3_tags(stream: &mut StreamReader) -> Result<u64, SyncError> {
    let mut pos = 0u64;
    loop {
        let mut tag = [0u8; id3::TAG_HEADER_LEN];
        if stream.read_at(pos, &mut tag) < tag.len() {
            return Err(SyncError::ShortRead);
        }
        let Some(len) = id3::tag_len(&tag) else {
            return Ok(pos);
        };
        debug!("skipping {len}-byte ID3v2 tag at {pos}");
        pos += len as u64;
    }
}

/// Locates the next confirmed ADTS frame at or after `pos`.
///
/// ADTS carries no session-invariant header bits to pin down; the sync
/// word plus the frame-size-driven successor chain is the whole
/// validation.
pub fn resync_adts(stream: &mut StreamReader, pos: u64) -> Result<u64, SyncError> {
    let start = pos;
    let mut window = ScanWindow::new(pos);

    loop {
        if window.pos >= start + RESYNC_MAX_CHECK_BYTES {
            return Err(SyncError::Exhausted {
                start,
                limit: RESYNC_MAX_CHECK_BYTES,
            });
        }
        if !window.ensure(stream, adts::HEADER_LEN) {
            return Err(SyncError::ShortRead);
        }

        let Some(head) = AdtsHeader::parse(window.bytes()) else {
            window.advance();
            continue;
        };

        if confirm_adts(stream, window.pos + head.frame_size as u64) {
            debug!("locked ADTS frame at {}", window.pos);
            return Ok(window.pos);
        }

        window.advance();
    }
}

fn confirm_adts(stream: &mut StreamReader, mut test_pos: u64) -> bool {
    for _ in 0..FRAME_MATCH_REQUIRED {
        let mut raw = [0u8; adts::HEADER_LEN];
        if stream.read_at(test_pos, &mut raw) < raw.len() {
            return false;
        }
        let Some(head) = AdtsHeader::parse(&raw) else {
            return false;
        };
        test_pos += head.frame_size as u64;
    }
    true
}

#[cfg(test)]
fn mp3_frame(header: u32) -> Vec<u8> {
    let size = Mp3Header::parse(header).unwrap().frame_size;
    let mut frame = vec![0u8; size];
    frame[..4].copy_from_slice(&header.to_be_bytes());
    frame
}

#[cfg(test)]
fn adts_frame(size: usize) -> Vec<u8> {
    let mut frame = vec![0u8; size];
    frame[0] = 0xFF;
    frame[1] = 0xF1;
    frame[2] = 0x50;
    frame[3] = 0x80 | ((size >> 11) & 0x03) as u8;
    frame[4] = (size >> 3) as u8;
    frame[5] = ((size & 0x07) << 5) as u8;
    frame
}

#[cfg(test)]
fn reader_over(data: Vec<u8>) -> StreamReader {
    crate::stream::open(64 * 1024, Some(Box::new(std::io::Cursor::new(data)))).0
}

#[test]
fn sync_past_id3_tag() {
    let mut data = Vec::new();
    data.extend_from_slice(b"ID3\x03\x00\x00\x00\x00\x00\x20");
    data.extend_from_slice(&[0xAA; 32]);
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));
    }

    let mut stream = reader_over(data);
    let point = resync_mp3(&mut stream, 0, 0).unwrap();
    assert_eq!(point.pos, 42);
    assert_eq!(point.header, 0xFFFB_9000);
}

#[test]
fn sync_past_concatenated_id3_tags() {
    let mut data = Vec::new();
    data.extend_from_slice(b"ID3\x03\x00\x00\x00\x00\x00\x10");
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(b"ID3\x04\x00\x00\x00\x00\x00\x08");
    data.extend_from_slice(&[0u8; 8]);
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));
    }

    let mut stream = reader_over(data);
    let point = resync_mp3(&mut stream, 0, 0).unwrap();
    assert_eq!(point.pos, 26 + 18);
}

#[test]
fn sync_scans_past_garbage() {
    let mut data = vec![0u8; 2000];
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));
    }

    let mut stream = reader_over(data);
    let point = resync_mp3(&mut stream, 0, 0).unwrap();
    assert_eq!(point.pos, 2000);
}

#[test]
fn sync_gives_up_past_scan_bound() {
    let mut data = vec![0u8; 9000];
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));
    }

    let mut stream = reader_over(data);
    assert!(matches!(
        resync_mp3(&mut stream, 0, 0),
        Err(SyncError::Exhausted { .. })
    ));
}

#[test]
fn sync_needs_full_successor_chain() {
    // Two frames only: the candidate plus one successor. Confirmation
    // needs two successors, so this must not lock.
    let mut data = Vec::new();
    data.extend_from_slice(&mp3_frame(0xFFFB_9000));
    data.extend_from_slice(&mp3_frame(0xFFFB_9000));

    let mut stream = reader_over(data);
    assert!(resync_mp3(&mut stream, 0, 0).is_err());
}

#[test]
fn sync_refuses_fixed_header_mismatch() {
    // Valid stream at 48 kHz (sampling-rate index 1).
    let mut data = Vec::new();
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(0xFFFB_9400));
    }

    // A reference header at 44.1 kHz refuses it even though the stream is
    // self-consistent.
    let mut stream = reader_over(data.clone());
    assert!(resync_mp3(&mut stream, 0xFFFB_9000, 0).is_err());

    // Without a reference it locks fine.
    let mut stream = reader_over(data);
    assert_eq!(resync_mp3(&mut stream, 0, 0).unwrap().pos, 0);
}

#[test]
fn sync_backtracks_past_false_positive() {
    // A lone valid-looking header whose successor chain leads nowhere,
    // then a genuine frame sequence a few bytes later.
    let mut data = Vec::new();
    data.extend_from_slice(&0xFFFB_9000u32.to_be_bytes());
    data.extend_from_slice(&[0x11; 463]);
    let genuine = data.len() as u64;
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));
    }

    let mut stream = reader_over(data);
    let point = resync_mp3(&mut stream, 0, 0).unwrap();
    assert_eq!(point.pos, genuine);
}

#[test]
fn adts_sync_and_garbage_recovery() {
    let mut data = Vec::new();
    for _ in 0..3 {
        data.extend_from_slice(&adts_frame(200));
    }
    let mut stream = reader_over(data);
    assert_eq!(resync_adts(&mut stream, 0).unwrap(), 0);

    let mut data = vec![0u8; 57];
    for _ in 0..3 {
        data.extend_from_slice(&adts_frame(200));
    }
    let mut stream = reader_over(data);
    assert_eq!(resync_adts(&mut stream, 0).unwrap(), 57);
}

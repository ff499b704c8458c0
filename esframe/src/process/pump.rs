//! The per-frame fast path.
//!
//! Once a session is locked, almost every call reads a header exactly at
//! the cursor, computes the frame length and hands the payload out. Only
//! when the bytes at the cursor stop looking like the locked stream does
//! the pump fall back to a full resync.

use log::debug;

use crate::process::sync::{resync_adts, resync_mp3};
use crate::stream::StreamReader;
use crate::structs::adts::{self, AdtsHeader};
use crate::structs::mp3::{self, Mp3Header};

/// Couples the session cursor to the ring's release watermark.
///
/// Every commit publishes the new position so the producer can reclaim the
/// bytes below it, and the drop impl publishes once more so early
/// end-of-stream returns leave the watermark at the final cursor too.
struct Cursor<'a> {
    stream: &'a mut StreamReader,
    pos: &'a mut u64,
}

impl Cursor<'_> {
    fn pos(&self) -> u64 {
        *self.pos
    }

    fn commit(&mut self, pos: u64) {
        *self.pos = pos;
        self.stream.seek_release(pos);
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.stream.seek_release(*self.pos);
    }
}

/// Reads the next MP3 frame at `pos` into `out`, resyncing when the bytes
/// there no longer look like the locked stream. `None` means end of stream
/// or a desync nothing after the cursor can repair.
pub fn next_frame_mp3(
    stream: &mut StreamReader,
    pos: &mut u64,
    fixed_header: u32,
    out: &mut Vec<u8>,
) -> Option<usize> {
    let mut cursor = Cursor { stream, pos };

    let frame = loop {
        let at = cursor.pos();
        let mut raw = [0u8; mp3::HEADER_LEN];
        if cursor.stream.read_at(at, &mut raw) < raw.len() {
            return None;
        }
        let header = u32::from_be_bytes(raw);

        if (header ^ fixed_header) & mp3::FIXED_HEADER_MASK == 0 {
            if let Ok(parsed) = Mp3Header::parse(header) {
                break parsed;
            }
        }

        // Lost sync.
        match resync_mp3(cursor.stream, fixed_header, at) {
            Ok(point) => cursor.commit(point.pos),
            Err(err) => {
                debug!("resync failed at {at}: {err}");
                return None;
            }
        }
    };

    emit(&mut cursor, frame.frame_size, out)
}

/// ADTS counterpart of [`next_frame_mp3`]. The sync word check is the
/// whole header validation.
pub fn next_frame_adts(
    stream: &mut StreamReader,
    pos: &mut u64,
    out: &mut Vec<u8>,
) -> Option<usize> {
    let mut cursor = Cursor { stream, pos };

    let size = loop {
        let at = cursor.pos();
        let mut raw = [0u8; adts::HEADER_LEN];
        if cursor.stream.read_at(at, &mut raw) < raw.len() {
            return None;
        }
        if let Some(head) = AdtsHeader::parse(&raw) {
            break head.frame_size;
        }

        // Lost sync.
        match resync_adts(cursor.stream, at) {
            Ok(pos) => cursor.commit(pos),
            Err(err) => {
                debug!("resync failed at {at}: {err}");
                return None;
            }
        }
    };

    emit(&mut cursor, size, out)
}

fn emit(cursor: &mut Cursor<'_>, frame_size: usize, out: &mut Vec<u8>) -> Option<usize> {
    let pos = cursor.pos();
    out.resize(frame_size, 0);
    if cursor.stream.read_at(pos, out) < frame_size {
        return None;
    }
    cursor.commit(pos + frame_size as u64);
    Some(frame_size)
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
fn pump_emits_varying_bitrates_and_padding() {
    // Same fixed-header bits throughout; bitrate and padding vary.
    let headers = [0xFFFB_9000u32, 0xFFFB_B000, 0xFFFB_9200];
    let mut data = Vec::new();
    let mut sizes = Vec::new();
    for &h in &headers {
        let frame = mp3_frame(h);
        sizes.push(frame.len());
        data.extend_from_slice(&frame);
    }
    let total = data.len() as u64;

    let mut stream = reader_over(data);
    let mut pos = 0u64;
    let mut buf = Vec::new();

    for &expected in &sizes {
        let got = next_frame_mp3(&mut stream, &mut pos, 0xFFFB_9000, &mut buf).unwrap();
        assert_eq!(got, expected);
    }
    assert_eq!(pos, total);
    assert_eq!(next_frame_mp3(&mut stream, &mut pos, 0xFFFB_9000, &mut buf), None);
}

#[test]
fn pump_resyncs_past_inserted_garbage() {
    let header = 0xFFFB_9000u32;
    let mut data = Vec::new();
    data.extend_from_slice(&mp3_frame(header));
    data.push(0x00);
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(header));
    }
    let total = data.len() as u64;

    let mut stream = reader_over(data);
    let mut pos = 0u64;
    let mut buf = Vec::new();

    let mut emitted = Vec::new();
    while let Some(size) = next_frame_mp3(&mut stream, &mut pos, header, &mut buf) {
        emitted.push(size);
        assert_eq!(&buf[..4], &header.to_be_bytes());
    }
    assert_eq!(emitted, vec![417, 417, 417, 417]);
    assert_eq!(pos, total);
}

#[test]
fn pump_publishes_release_watermark() {
    let header = 0xFFFB_9000u32;
    let mut data = Vec::new();
    for _ in 0..3 {
        data.extend_from_slice(&mp3_frame(header));
    }

    let mut stream = reader_over(data);
    let mut pos = 0u64;
    let mut buf = Vec::new();

    next_frame_mp3(&mut stream, &mut pos, header, &mut buf).unwrap();
    assert_eq!(pos, 417);

    // Bytes below the emitted frame's end went back to the producer.
    let mut probe = [0u8; 4];
    assert_eq!(stream.read_at(0, &mut probe), 0);
    assert_eq!(stream.read_at(417, &mut probe), 4);
}

#[test]
fn pump_emits_adts_frames() {
    let mut data = Vec::new();
    for _ in 0..3 {
        data.extend_from_slice(&adts_frame(200));
    }

    let mut stream = reader_over(data);
    let mut pos = 0u64;
    let mut buf = Vec::new();

    for _ in 0..3 {
        assert_eq!(next_frame_adts(&mut stream, &mut pos, &mut buf), Some(200));
    }
    assert_eq!(pos, 600);
    assert_eq!(next_frame_adts(&mut stream, &mut pos, &mut buf), None);
}

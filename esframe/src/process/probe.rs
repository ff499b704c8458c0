//! Stream type probing.
//!
//! Classification is trial synchronization: a stream the MP3 resync can
//! lock is MP3, then likewise for ADTS. An ID3v2 prefix short-circuits to
//! MP3 and an ADIF prefix is rejected outright. Probing reads far ahead of
//! offset 0 and must not let the ring hand bytes back to the producer —
//! the session still needs them from the start — so both trial syncs run
//! under a dequeue-suppression guard.

use log::debug;

use crate::process::AudioType;
use crate::process::sync::{resync_adts, resync_mp3};
use crate::stream::StreamReader;
use crate::structs::{adts, id3};

/// Classifies the stream by sniffing its first bytes and trial-syncing.
pub fn probe(stream: &mut StreamReader) -> AudioType {
    if looks_like_mp3(stream) {
        return AudioType::Mp3;
    }
    if looks_like_adts(stream) {
        return AudioType::Aac;
    }
    AudioType::Unknown
}

fn looks_like_mp3(stream: &mut StreamReader) -> bool {
    let mut tag = [0u8; id3::TAG_HEADER_LEN];
    if stream.read_at(0, &mut tag) < tag.len() {
        return false;
    }
    if tag.starts_with(b"ID3") {
        return true;
    }

    let mut stream = stream.suppress_dequeue();
    resync_mp3(&mut stream, 0, 0).is_ok()
}

fn looks_like_adts(stream: &mut StreamReader) -> bool {
    let mut magic = [0u8; adts::ADIF_MAGIC.len()];
    if stream.read_at(0, &mut magic) < magic.len() {
        return false;
    }
    if &magic == adts::ADIF_MAGIC {
        debug!("ADIF container detected, not supported");
        return false;
    }

    let mut stream = stream.suppress_dequeue();
    resync_adts(&mut stream, 0).is_ok()
}

#[cfg(test)]
use crate::stream::open;

#[cfg(test)]
fn reader_over(data: Vec<u8>) -> StreamReader {
    open(64 * 1024, Some(Box::new(std::io::Cursor::new(data)))).0
}

#[test]
fn id3_prefix_is_mp3() {
    // The tag alone classifies the stream; no audio frame is needed yet.
    let mut data = Vec::new();
    data.extend_from_slice(b"ID3\x03\x00\x00\x00\x00\x00\x20");
    data.extend_from_slice(&[0u8; 32]);

    let mut stream = reader_over(data);
    assert_eq!(probe(&mut stream), AudioType::Mp3);
}

#[test]
fn bare_frames_probe_by_resync() {
    let header = 0xFFFB_9000u32;
    let frame_size = crate::structs::mp3::Mp3Header::parse(header)
        .unwrap()
        .frame_size;
    let mut data = Vec::new();
    for _ in 0..3 {
        let mut frame = vec![0u8; frame_size];
        frame[..4].copy_from_slice(&header.to_be_bytes());
        data.extend_from_slice(&frame);
    }

    let mut stream = reader_over(data);
    assert_eq!(probe(&mut stream), AudioType::Mp3);

    let mut data = Vec::new();
    for _ in 0..3 {
        let mut frame = vec![0u8; 200];
        frame[..6].copy_from_slice(&[0xFF, 0xF1, 0x50, 0x80, 0x19, 0x00]);
        data.extend_from_slice(&frame);
    }

    let mut stream = reader_over(data);
    assert_eq!(probe(&mut stream), AudioType::Aac);
}

#[test]
fn adif_is_rejected() {
    let mut data = b"ADIF".to_vec();
    data.extend_from_slice(&[0x55; 256]);

    let mut stream = reader_over(data);
    assert_eq!(probe(&mut stream), AudioType::Unknown);
}

#[test]
fn garbage_is_unknown() {
    let mut stream = reader_over(vec![0x42; 4096]);
    assert_eq!(probe(&mut stream), AudioType::Unknown);
}

#[test]
fn probing_leaves_dequeue_enabled() {
    let (mut stream, producer) = open(64 * 1024, None);
    producer.push(&[0x42; 512]);

    assert_eq!(probe(&mut stream), AudioType::Unknown);
    assert!(stream.allow_dequeue());

    // The probe reads ahead but releases nothing.
    let mut out = [0u8; 4];
    assert_eq!(stream.read_at(0, &mut out), 4);
}

//! The player driver: session state, decoder wiring and the frame loop.
//!
//! A [`Player`] owns the ring-backed stream, probes the elementary-stream
//! type, locks the first frame boundary and then pumps exact frame
//! payloads to a caller-supplied [`FrameDecoder`]. The heavy lifting lives
//! in [`crate::process`]; this module is the dispatch glue around it.
//!
//! Decoders stay opaque: the driver never looks inside them, it only
//! forwards complete frames and reads back PCM descriptors. Buffers,
//! stream handle and decoder state are all owned here and released on
//! drop, on every exit path.

use anyhow::Result;
use log::{debug, warn};

use crate::process::pump::{next_frame_adts, next_frame_mp3};
use crate::process::sync::{resync_adts, resync_mp3};
use crate::process::{AudioType, probe};
use crate::stream::{Producer, Source, StreamReader, open};
use crate::utils::errors::{DecodeError, PlayerError};

/// One decoded frame of interleaved PCM.
///
/// The sample slice borrows decoder-owned memory and is valid until the
/// next decode call.
#[derive(Debug)]
pub struct PcmFrame<'a> {
    pub samples: &'a [i16],
    pub channels: u16,
    pub sample_rate_hz: u32,
}

/// A compressed-frame decoder adapter.
///
/// Implementations receive one complete frame payload per call, exactly as
/// it appeared in the stream, and expose the resulting PCM without giving
/// up ownership of the sample memory.
pub trait FrameDecoder {
    /// Returns the decoder to its initial state.
    fn reset(&mut self);

    /// Decodes one complete frame payload.
    fn decode(&mut self, frame: &[u8]) -> Result<PcmFrame<'_>, DecodeError>;
}

/// Per-format framing state, fixed once the first frame is locked.
enum Framing {
    /// MP3 keeps the session-invariant header bits; resync candidates that
    /// disagree with them are refused even when self-consistent.
    Mp3 { fixed_header: u32 },
    Adts,
}

/// Streaming de-framer and decode-loop driver for one audio session.
///
/// The ring must be able to hold a full resync span: the scan bound plus
/// a confirmation chain of maximum-size frames. 64 KiB is a comfortable
/// floor.
pub struct Player {
    stream: StreamReader,
    producer: Producer,
    audio_type: AudioType,
    framing: Option<Framing>,
    current_pos: u64,
    decoder: Option<Box<dyn FrameDecoder>>,
    frame_buf: Vec<u8>,
}

impl Player {
    /// Creates a player over a fresh ring of `ring_capacity` bytes, fed by
    /// `source` whenever the consumer outruns the producer.
    pub fn new(ring_capacity: usize, source: impl Source + 'static) -> Self {
        let (stream, producer) = open(ring_capacity, Some(Box::new(source)));
        Self {
            stream,
            producer,
            audio_type: AudioType::Unknown,
            framing: None,
            current_pos: 0,
            decoder: None,
            frame_buf: Vec::new(),
        }
    }

    /// The push handle for feeding the ring from the producer side.
    pub fn producer(&self) -> Producer {
        self.producer.clone()
    }

    /// Classifies the stream, probing on first call and caching the
    /// answer.
    pub fn audio_type(&mut self) -> AudioType {
        if self.audio_type == AudioType::Unknown {
            self.audio_type = probe::probe(&mut self.stream);
            debug!("probed stream type: {}", self.audio_type);
        }
        self.audio_type
    }

    /// Byte offset of the next frame to emit.
    pub fn position(&self) -> u64 {
        self.current_pos
    }

    /// The session-invariant MP3 header bits, once locked.
    pub fn fixed_header(&self) -> Option<u32> {
        match self.framing {
            Some(Framing::Mp3 { fixed_header }) => Some(fixed_header),
            _ => None,
        }
    }

    /// Locks the first frame boundary without attaching a decoder, for
    /// callers that only de-frame.
    ///
    /// A concrete `hint` is trusted as-is; pass [`AudioType::Unknown`] to
    /// probe the stream instead.
    pub fn init(&mut self, hint: AudioType) -> Result<(), PlayerError> {
        let audio_type = self.resolve_type(hint)?;
        self.lock_first_frame(audio_type)
    }

    /// Full session initialization: resolves the stream type, obtains a
    /// configured decoder from `configure`, resets it and locks the first
    /// frame boundary.
    ///
    /// `configure` runs once per session, before any frame is emitted, and
    /// is the place to apply caller-side decoder settings for the detected
    /// type.
    pub fn init_decoder(
        &mut self,
        hint: AudioType,
        configure: impl FnOnce(AudioType) -> Result<Box<dyn FrameDecoder>>,
    ) -> Result<(), PlayerError> {
        let audio_type = self.resolve_type(hint)?;

        let mut decoder = configure(audio_type).map_err(PlayerError::DecoderInit)?;
        decoder.reset();

        self.lock_first_frame(audio_type)?;
        self.decoder = Some(decoder);
        Ok(())
    }

    fn resolve_type(&mut self, hint: AudioType) -> Result<AudioType, PlayerError> {
        // A caller-supplied type is trusted; Unknown falls back to probing.
        self.audio_type = hint;
        match self.audio_type() {
            AudioType::Unknown => Err(PlayerError::UnsupportedFormat),
            ty => Ok(ty),
        }
    }

    fn lock_first_frame(&mut self, audio_type: AudioType) -> Result<(), PlayerError> {
        self.current_pos = 0;
        let framing = match audio_type {
            AudioType::Mp3 => {
                let point = resync_mp3(&mut self.stream, 0, 0)?;
                self.current_pos = point.pos;
                Framing::Mp3 {
                    fixed_header: point.header,
                }
            }
            AudioType::Aac => {
                self.current_pos = resync_adts(&mut self.stream, 0)?;
                Framing::Adts
            }
            AudioType::Unknown => return Err(PlayerError::UnsupportedFormat),
        };

        // First watermark: everything before the first frame is metadata
        // or garbage the producer can reclaim.
        self.stream.seek_release(self.current_pos);
        self.framing = Some(framing);
        Ok(())
    }

    /// Pumps the next exact frame payload.
    ///
    /// `None` signals end of stream or an unrecoverable desync. Requires a
    /// prior successful [`init`](Self::init) or
    /// [`init_decoder`](Self::init_decoder).
    pub fn next_frame(&mut self) -> Option<&[u8]> {
        let framing = self.framing.as_ref()?;
        let size = match framing {
            Framing::Mp3 { fixed_header } => next_frame_mp3(
                &mut self.stream,
                &mut self.current_pos,
                *fixed_header,
                &mut self.frame_buf,
            ),
            Framing::Adts => {
                next_frame_adts(&mut self.stream, &mut self.current_pos, &mut self.frame_buf)
            }
        }?;
        Some(&self.frame_buf[..size])
    }

    /// Runs the pump/decode loop until end of stream, handing each decoded
    /// frame to `sink`.
    ///
    /// Frames the decoder rejects are logged and skipped; the session
    /// continues with the next frame. Returns the number of frames decoded
    /// successfully.
    pub fn run(&mut self, mut sink: impl FnMut(PcmFrame<'_>)) -> Result<u64, PlayerError> {
        let Some(framing) = self.framing.as_ref() else {
            return Err(PlayerError::NotInitialized);
        };
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(PlayerError::NotInitialized);
        };

        let stream = &mut self.stream;
        let pos = &mut self.current_pos;
        let buf = &mut self.frame_buf;
        let mut decoded = 0u64;

        loop {
            let size = match framing {
                Framing::Mp3 { fixed_header } => next_frame_mp3(stream, pos, *fixed_header, buf),
                Framing::Adts => next_frame_adts(stream, pos, buf),
            };
            let Some(size) = size else {
                break;
            };

            match decoder.decode(&buf[..size]) {
                Ok(pcm) => {
                    decoded += 1;
                    sink(pcm);
                }
                Err(err) => warn!("skipping undecodable frame at {}: {err}", *pos - size as u64),
            }
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn mp3_frame(header: u32) -> Vec<u8> {
        let size = crate::structs::mp3::Mp3Header::parse(header)
            .unwrap()
            .frame_size;
        let mut frame = vec![0u8; size];
        frame[..4].copy_from_slice(&header.to_be_bytes());
        frame
    }

    fn player_over(data: Vec<u8>) -> Player {
        Player::new(64 * 1024, std::io::Cursor::new(data))
    }

    struct StubDecoder {
        pcm: Vec<i16>,
        fail_every: Option<u64>,
        calls: u64,
    }

    impl StubDecoder {
        fn boxed(fail_every: Option<u64>) -> Box<dyn FrameDecoder> {
            Box::new(Self {
                pcm: vec![0i16; 1152 * 2],
                fail_every,
                calls: 0,
            })
        }
    }

    impl FrameDecoder for StubDecoder {
        fn reset(&mut self) {
            self.calls = 0;
        }

        fn decode(&mut self, _frame: &[u8]) -> Result<PcmFrame<'_>, DecodeError> {
            self.calls += 1;
            if let Some(n) = self.fail_every {
                if self.calls % n == 0 {
                    return Err(DecodeError::BadFrame);
                }
            }
            Ok(PcmFrame {
                samples: &self.pcm,
                channels: 2,
                sample_rate_hz: 44_100,
            })
        }
    }

    #[test]
    fn session_over_tagged_stream() {
        // A 32-byte ID3v2 payload, then three frames.
        let mut data = Vec::new();
        data.extend_from_slice(b"ID3\x03\x00\x00\x00\x00\x00\x20");
        data.extend_from_slice(&[0xAA; 32]);
        for _ in 0..3 {
            data.extend_from_slice(&mp3_frame(0xFFFB_9000));
        }

        let mut player = player_over(data);
        assert_eq!(player.audio_type(), AudioType::Mp3);

        player.init(AudioType::Unknown).unwrap();
        assert_eq!(player.position(), 42);
        assert_eq!(player.fixed_header(), Some(0xFFFB_9000));

        let first = player.next_frame().unwrap();
        assert_eq!(first.len(), 417);
        assert_eq!(player.position(), 42 + 417);
    }

    #[test]
    fn init_fails_without_confirmable_frames() {
        // Two frames cannot satisfy the two-successor confirmation.
        let mut data = Vec::new();
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));
        data.extend_from_slice(&mp3_frame(0xFFFB_9000));

        let mut player = player_over(data);
        assert!(matches!(
            player.init(AudioType::Mp3),
            Err(PlayerError::NoInitialSync(_))
        ));
    }

    #[test]
    fn unknown_stream_is_unsupported() {
        let mut data = b"ADIF".to_vec();
        data.extend_from_slice(&[0x55; 128]);

        let mut player = player_over(data);
        assert!(matches!(
            player.init_decoder(AudioType::Unknown, |_| Ok(StubDecoder::boxed(None))),
            Err(PlayerError::UnsupportedFormat)
        ));
    }

    #[test]
    fn configure_failure_is_fatal() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&mp3_frame(0xFFFB_9000));
        }

        let mut player = player_over(data);
        assert!(matches!(
            player.init_decoder(AudioType::Unknown, |_| Err(anyhow!("no such codec"))),
            Err(PlayerError::DecoderInit(_))
        ));
    }

    #[test]
    fn run_skips_undecodable_frames() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&mp3_frame(0xFFFB_9000));
        }
        let total = data.len() as u64;

        let mut player = player_over(data);
        player
            .init_decoder(AudioType::Unknown, |ty| {
                assert_eq!(ty, AudioType::Mp3);
                Ok(StubDecoder::boxed(Some(2)))
            })
            .unwrap();

        let mut sunk = 0;
        let decoded = player.run(|pcm| {
            assert_eq!(pcm.channels, 2);
            sunk += 1;
        });
        // Every second frame fails to decode and is dropped, but the pump
        // still walks the whole stream.
        assert_eq!(decoded.unwrap(), 2);
        assert_eq!(sunk, 2);
        assert_eq!(player.position(), total);
    }

    #[test]
    fn run_requires_initialization() {
        let mut player = player_over(Vec::new());
        assert!(matches!(
            player.run(|_| {}),
            Err(PlayerError::NotInitialized)
        ));
    }

    #[test]
    fn producer_feeds_the_session() {
        let mut frames = Vec::new();
        for _ in 0..3 {
            frames.extend_from_slice(&mp3_frame(0xFFFB_9000));
        }

        // No pull source; all bytes arrive through the push handle.
        let mut player = player_over(Vec::new());
        let producer = player.producer();
        assert_eq!(producer.push(&frames), frames.len());
        assert!(!producer.is_empty());

        assert_eq!(player.audio_type(), AudioType::Mp3);
        player.init(AudioType::Mp3).unwrap();
        assert_eq!(player.next_frame().map(<[u8]>::len), Some(417));
    }
}

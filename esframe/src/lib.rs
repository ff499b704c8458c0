//! Frame synchronization and de-framing for MP3 and AAC (ADTS) elementary
//! streams.
//!
//! ## Technical Overview
//!
//! Compressed audio arrives as an unbounded byte stream with leading
//! metadata, junk between frames and no out-of-band framing. This crate
//! classifies the stream, locates frame boundaries and feeds exact frame
//! payloads to a downstream decoder:
//!
//! 1. Bytes enter a bounded ring through a push handle
//!    ([`stream::Producer`]) or a pull source ([`stream::Source`]).
//! 2. The prober classifies the stream by sniffing prefix bytes and
//!    trial-syncing.
//! 3. The synchronizers skip ID3v2 tags and scan for a header whose
//!    frame-size chain is confirmed by further headers, defending against
//!    sync patterns that occur by chance inside random data.
//! 4. The pump emits one exact frame payload at a time, resyncing when
//!    framing is lost mid-stream.
//! 5. The [`player::Player`] drives the loop and hands payloads to a
//!    caller-supplied decoder.
//!
//! Consumed bytes are handed back to the producer cooperatively: whenever
//! the session cursor advances, everything below it may be reclaimed, so a
//! fixed-size ring can carry an unbounded stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use esframe::player::Player;
//! use esframe::process::AudioType;
//!
//! let data = std::fs::read("stream.mp3")?;
//! let mut player = Player::new(256 * 1024, std::io::Cursor::new(data));
//!
//! player.init(AudioType::Unknown)?;
//! println!("format: {}", player.audio_type());
//!
//! while let Some(frame) = player.next_frame() {
//!     println!("frame of {} bytes", frame.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// The player driver around the synchronization core.
///
/// Session state, decoder wiring and the pump/decode loop.
pub mod player;

/// Stream classification, frame synchronization and the frame pump.
///
/// 1. **Probing** ([`process::probe`]): stream type classification.
/// 2. **Synchronization** ([`process::sync`]): confirmed frame boundaries
///    in raw bytes.
/// 3. **Pumping** ([`process::pump`]): per-frame payload emission.
pub mod process;

/// Ring-buffered producer/consumer byte stream with cooperative release.
pub mod stream;

/// Byte-level format structures.
///
/// - **MP3 headers** ([`structs::mp3`]): bit-field validation, frame sizing
/// - **ADTS headers** ([`structs::adts`]): sync word, frame-length field
/// - **ID3v2 tags** ([`structs::id3`]): syncsafe lengths for skipping
pub mod structs;

/// Error types and supporting infrastructure.
pub mod utils;

//! Stream classification, frame synchronization and the frame pump.
//!
//! 1. **Probing** ([`probe`]): classifies an unknown byte stream as MP3 or
//!    ADTS by sniffing prefix bytes and trial-syncing.
//!
//! 2. **Synchronization** ([`sync`]): locates a confirmed frame boundary
//!    in raw bytes, skipping leading metadata and scanning past garbage.
//!
//! 3. **Pumping** ([`pump`]): emits successive exact frame payloads,
//!    falling back to a resync whenever framing is lost.

pub mod probe;
pub mod pump;
pub mod sync;

use std::fmt::Display;

/// Elementary-stream classification.
///
/// A non-`Unknown` value selects the framing algorithm and the decoder
/// adapter for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioType {
    /// Not probed yet, or not a recognized format.
    Unknown,
    Mp3,
    /// AAC in ADTS framing.
    Aac,
}

impl Display for AudioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioType::Unknown => write!(f, "unknown"),
            AudioType::Mp3 => write!(f, "MP3"),
            AudioType::Aac => write!(f, "AAC (ADTS)"),
        }
    }
}

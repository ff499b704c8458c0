/// Reasons a 32-bit MP3 frame header fails validation.
///
/// All of these drive the same local recovery in the scanner: advance one
/// byte and try again.
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("Sync bits missing from frame header. Read {0:#010X}")]
    BadSync(u32),

    #[error("Reserved MPEG version code")]
    ReservedVersion,

    #[error("Reserved layer code")]
    ReservedLayer,

    #[error("Free-format bitrate (index 0) is not supported")]
    FreeFormatBitrate,

    #[error("Bitrate index 15 is invalid")]
    BadBitrateIndex,

    #[error("Reserved sampling-rate index")]
    ReservedSamplingRate,
}

/// Ways a resync attempt can come up empty.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("Stream ended before a frame could be confirmed")]
    ShortRead,

    #[error("No confirmed frame within {limit} bytes of offset {start}")]
    Exhausted { start: u64, limit: u64 },
}

/// Fatal session-level failures surfaced by the player driver.
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    #[error("Stream format is not recognized or not supported")]
    UnsupportedFormat,

    #[error("Could not locate an initial frame boundary")]
    NoInitialSync(#[from] SyncError),

    #[error("Decoder initialization failed")]
    DecoderInit(#[source] anyhow::Error),

    #[error("Player is not initialized")]
    NotInitialized,
}

/// Failures reported by a frame decoder adapter.
///
/// The frame loop treats these as per-frame events: the offending frame is
/// dropped and pumping continues.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("Decoder rejected the frame payload")]
    BadFrame,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

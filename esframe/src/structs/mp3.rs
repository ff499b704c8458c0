//! MP3 frame header parsing and frame sizing.
//!
//! An MP3 elementary stream is a sequence of self-delimiting frames, each
//! starting with a 32-bit big-endian header. The header alone determines
//! the frame length, so de-framing never has to look at payload bytes.
//!
//! ## Header layout
//!
//! | bits  | field |
//! |-------|-------|
//! | 31–21 | sync word (all ones) |
//! | 20–19 | MPEG version |
//! | 18–17 | layer |
//! | 15–12 | bitrate index |
//! | 11–10 | sampling-rate index |
//! | 9     | padding |
//!
//! Free-format frames (bitrate index 0) are rejected: their size cannot be
//! derived from the header, so they cannot be de-framed without decoding.

use crate::utils::errors::HeaderError;

/// Sync bits that must all be set in any valid frame header.
pub const SYNC_MASK: u32 = 0xFFE0_0000;

/// Header bits that stay constant across every frame of one stream:
/// sync word, version, layer and sampling-rate index.
pub const FIXED_HEADER_MASK: u32 = 0xFFFE_0C00;

/// Frame header length in bytes.
pub const HEADER_LEN: usize = 4;

// Sampling rates in Hz, indexed by the 2-bit sampling-rate field.
const SAMPLING_RATE_V1: [u32; 3] = [44_100, 48_000, 32_000];
const SAMPLING_RATE_V2: [u32; 3] = [22_050, 24_000, 16_000];
const SAMPLING_RATE_V2_5: [u32; 3] = [11_025, 12_000, 8_000];

// Bitrates in kbps, indexed by bitrate index 1..=14.
// V1 = MPEG-1, V2 = MPEG-2 and MPEG-2.5; L1/L2/L3 = layer.
const BITRATE_V1_L1: [u32; 14] = [
    32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const BITRATE_V2_L1: [u32; 14] = [
    32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const BITRATE_V1_L2: [u32; 14] = [
    32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const BITRATE_V1_L3: [u32; 14] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATE_V2_L3: [u32; 14] = [
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

/// MPEG audio version. Code 1 is reserved and rejected during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

impl MpegVersion {
    fn from_code(code: u32) -> Result<Self, HeaderError> {
        match code {
            3 => Ok(Self::V1),
            2 => Ok(Self::V2),
            0 => Ok(Self::V2_5),
            _ => Err(HeaderError::ReservedVersion),
        }
    }

    fn sampling_rate(self, index: usize) -> u32 {
        match self {
            Self::V1 => SAMPLING_RATE_V1[index],
            Self::V2 => SAMPLING_RATE_V2[index],
            Self::V2_5 => SAMPLING_RATE_V2_5[index],
        }
    }
}

impl std::fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MpegVersion::V1 => write!(f, "MPEG-1"),
            MpegVersion::V2 => write!(f, "MPEG-2"),
            MpegVersion::V2_5 => write!(f, "MPEG-2.5"),
        }
    }
}

/// MPEG audio layer. Code 0 is reserved and rejected during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    I,
    II,
    III,
}

impl Layer {
    fn from_code(code: u32) -> Result<Self, HeaderError> {
        match code {
            3 => Ok(Self::I),
            2 => Ok(Self::II),
            1 => Ok(Self::III),
            _ => Err(HeaderError::ReservedLayer),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::I => write!(f, "Layer I"),
            Layer::II => write!(f, "Layer II"),
            Layer::III => write!(f, "Layer III"),
        }
    }
}

/// A validated MP3 frame header.
///
/// Construction via [`Mp3Header::parse`] guarantees every field is within
/// its legal range and that `frame_size` is derivable.
#[derive(Debug, Clone, Copy)]
pub struct Mp3Header {
    pub version: MpegVersion,
    pub layer: Layer,
    pub bitrate_kbps: u32,
    pub sample_rate_hz: u32,
    pub padding: bool,
    /// Total frame length in bytes, header included.
    pub frame_size: usize,
}

impl Mp3Header {
    /// Validates a 32-bit header word field by field and computes the
    /// frame size.
    pub fn parse(header: u32) -> Result<Self, HeaderError> {
        if header & SYNC_MASK != SYNC_MASK {
            return Err(HeaderError::BadSync(header));
        }

        let version = MpegVersion::from_code((header >> 19) & 0x3)?;
        let layer = Layer::from_code((header >> 17) & 0x3)?;

        let bitrate_index = ((header >> 12) & 0xF) as usize;
        match bitrate_index {
            0 => return Err(HeaderError::FreeFormatBitrate),
            15 => return Err(HeaderError::BadBitrateIndex),
            _ => {}
        }

        let sampling_rate_index = ((header >> 10) & 0x3) as usize;
        if sampling_rate_index == 3 {
            return Err(HeaderError::ReservedSamplingRate);
        }

        let sample_rate_hz = version.sampling_rate(sampling_rate_index);
        let padding = (header >> 9) & 0x1 == 1;

        let table = match (version, layer) {
            (MpegVersion::V1, Layer::I) => &BITRATE_V1_L1,
            (_, Layer::I) => &BITRATE_V2_L1,
            (MpegVersion::V1, Layer::II) => &BITRATE_V1_L2,
            (MpegVersion::V1, Layer::III) => &BITRATE_V1_L3,
            (_, _) => &BITRATE_V2_L3,
        };
        let bitrate_kbps = table[bitrate_index - 1];

        let frame_size = frame_size(version, layer, bitrate_kbps, sample_rate_hz, padding);

        Ok(Self {
            version,
            layer,
            bitrate_kbps,
            sample_rate_hz,
            padding,
            frame_size,
        })
    }

    /// Number of source samples one frame represents.
    pub fn samples_per_frame(&self) -> u32 {
        match (self.version, self.layer) {
            (_, Layer::I) => 384,
            (MpegVersion::V1, _) | (_, Layer::II) => 1152,
            (_, Layer::III) => 576,
        }
    }
}

// Frame size = samples-per-frame * bitrate / 8 / sample-rate, plus padding.
// Layer I counts 384 samples and pads in 4-byte slots; the other layers
// count 1152 samples (576 for MPEG-2/2.5 Layer III) and pad by one byte.
// Integer division truncates, which matches real-world encoder framing.
fn frame_size(
    version: MpegVersion,
    layer: Layer,
    bitrate_kbps: u32,
    sample_rate_hz: u32,
    padding: bool,
) -> usize {
    let bits_per_sec = u64::from(bitrate_kbps) * 1000;
    let sample_rate = u64::from(sample_rate_hz);
    let pad = u64::from(padding);

    let size = match (version, layer) {
        (_, Layer::I) => 384 * bits_per_sec / 8 / sample_rate + 4 * pad,
        (MpegVersion::V1, _) | (_, Layer::II) => 1152 * bits_per_sec / 8 / sample_rate + pad,
        (_, Layer::III) => 576 * bits_per_sec / 8 / sample_rate + pad,
    };

    size as usize
}

#[test]
fn parse_mpeg1_layer3() {
    let header = Mp3Header::parse(0xFFFB_9000).unwrap();
    assert_eq!(header.version, MpegVersion::V1);
    assert_eq!(header.layer, Layer::III);
    assert_eq!(header.bitrate_kbps, 128);
    assert_eq!(header.sample_rate_hz, 44_100);
    assert!(!header.padding);
    assert_eq!(header.frame_size, 417);
    assert_eq!(header.samples_per_frame(), 1152);
}

#[test]
fn padding_extends_frame() {
    // Same header with the padding bit set.
    let header = Mp3Header::parse(0xFFFB_9200).unwrap();
    assert!(header.padding);
    assert_eq!(header.frame_size, 418);

    // Layer I pads in 4-byte slots.
    let header = Mp3Header::parse(0xFFFF_9200).unwrap();
    assert_eq!(header.layer, Layer::I);
    assert_eq!(header.bitrate_kbps, 288);
    assert_eq!(header.frame_size, 313 + 4);
}

#[test]
fn parse_low_sampling_rate_versions() {
    let header = Mp3Header::parse(0xFFF3_9000).unwrap();
    assert_eq!(header.version, MpegVersion::V2);
    assert_eq!(header.bitrate_kbps, 80);
    assert_eq!(header.sample_rate_hz, 22_050);
    assert_eq!(header.frame_size, 261);
    assert_eq!(header.samples_per_frame(), 576);

    let header = Mp3Header::parse(0xFFE3_9000).unwrap();
    assert_eq!(header.version, MpegVersion::V2_5);
    assert_eq!(header.sample_rate_hz, 11_025);
    assert_eq!(header.frame_size, 522);
}

#[test]
fn reject_invalid_fields() {
    assert!(matches!(
        Mp3Header::parse(0x0000_0000),
        Err(HeaderError::BadSync(_))
    ));
    assert!(matches!(
        Mp3Header::parse(0xFFE8_9000),
        Err(HeaderError::ReservedVersion)
    ));
    assert!(matches!(
        Mp3Header::parse(0xFFF9_9000),
        Err(HeaderError::ReservedLayer)
    ));
    assert!(matches!(
        Mp3Header::parse(0xFFFB_0000),
        Err(HeaderError::FreeFormatBitrate)
    ));
    assert!(matches!(
        Mp3Header::parse(0xFFFB_F000),
        Err(HeaderError::BadBitrateIndex)
    ));
    assert!(matches!(
        Mp3Header::parse(0xFFFB_9C00),
        Err(HeaderError::ReservedSamplingRate)
    ));
}

#[test]
fn fixed_header_bits() {
    // Bitrate and padding may vary within a session.
    assert_eq!(
        0xFFFB_9000u32 & FIXED_HEADER_MASK,
        0xFFFB_B200u32 & FIXED_HEADER_MASK
    );
    // A different sampling-rate index must not.
    assert_ne!(
        0xFFFB_9000u32 & FIXED_HEADER_MASK,
        0xFFFB_9400u32 & FIXED_HEADER_MASK
    );
}

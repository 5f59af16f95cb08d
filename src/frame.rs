//! Frame wire types — the unit exchanged between encoder and decoder.
//!
//! ## Wire format
//!
//! Each frame is a 16-byte header followed by `size` payload bytes.
//! All header fields are big-endian (network byte order):
//!
//! ```text
//! offset 0   size              u32   payload length in bytes
//! offset 4   timestamp_micros  i64   presentation timestamp
//! offset 12  flags             u32   bit0 = CODEC_CONFIG, bit1 = END_OF_STREAM
//! ```
//!
//! The payload is a raw coded access unit, or the concatenated codec
//! configuration parameter sets when `CODEC_CONFIG` is set. Putting
//! `size` first lets a reader validate it before allocating or reading
//! any payload bytes.

use bitflags::bitflags;
use bytes::Bytes;

use crate::error::LinkError;

/// Encoded header size on the wire.
pub const HEADER_LEN: usize = 16;

/// Canonical upper bound for a single frame payload (2 MiB).
pub const MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

bitflags! {
    /// Per-frame flag bits carried in the wire header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u32 {
        /// The payload is decoder initialization data (SPS/PPS
        /// equivalents), not a coded picture.
        const CODEC_CONFIG = 1 << 0;
        /// The final frame of the stream.
        const END_OF_STREAM = 1 << 1;
    }
}

// ── FrameHeader ──────────────────────────────────────────────────

/// The fixed-size wire header preceding every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub size: u32,
    pub timestamp_micros: i64,
    pub flags: u32,
}

impl FrameHeader {
    /// Serialize to bytes (big-endian).
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.size.to_be_bytes());
        buf[4..12].copy_from_slice(&self.timestamp_micros.to_be_bytes());
        buf[12..16].copy_from_slice(&self.flags.to_be_bytes());
        buf
    }

    /// Deserialize from bytes. Requires at least [`HEADER_LEN`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self, LinkError> {
        if data.len() < HEADER_LEN {
            return Err(LinkError::Protocol("header shorter than 16 bytes"));
        }
        Ok(Self {
            size: u32::from_be_bytes(data[0..4].try_into().map_err(
                |_| LinkError::Protocol("malformed size field"),
            )?),
            timestamp_micros: i64::from_be_bytes(data[4..12].try_into().map_err(
                |_| LinkError::Protocol("malformed timestamp field"),
            )?),
            flags: u32::from_be_bytes(data[12..16].try_into().map_err(
                |_| LinkError::Protocol("malformed flags field"),
            )?),
        })
    }

    /// Enforce the size invariant `0 < size <= max`.
    ///
    /// Must be called before any payload bytes are consumed, so an
    /// oversized claim never triggers a payload-sized allocation.
    pub fn validate(&self, max: usize) -> Result<(), LinkError> {
        if self.size == 0 {
            return Err(LinkError::EmptyFrame);
        }
        if self.size as usize > max {
            return Err(LinkError::FrameTooLarge {
                size: self.size as usize,
                max,
            });
        }
        Ok(())
    }
}

// ── Frame ────────────────────────────────────────────────────────

/// One transport unit: a coded access unit or a configuration frame,
/// tagged with its presentation timestamp and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Presentation timestamp in microseconds.
    pub timestamp_micros: i64,
    /// Flag bits, preserved end to end.
    pub flags: FrameFlags,
    /// Payload bytes. Never empty on the wire.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(timestamp_micros: i64, flags: FrameFlags, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp_micros,
            flags,
            payload: payload.into(),
        }
    }

    /// A codec-configuration frame. Configuration data has no
    /// presentation time of its own.
    pub fn config(parameter_sets: impl Into<Bytes>) -> Self {
        Self::new(0, FrameFlags::CODEC_CONFIG, parameter_sets)
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn is_config(&self) -> bool {
        self.flags.contains(FrameFlags::CODEC_CONFIG)
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.flags.contains(FrameFlags::END_OF_STREAM)
    }

    /// The wire header for this frame.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            size: self.payload.len() as u32,
            timestamp_micros: self.timestamp_micros,
            flags: self.flags.bits(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

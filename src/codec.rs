//! `FrameCodec` — framed TCP I/O for [`Frame`] via `tokio_util`.
//!
//! The decoder is a state machine over the read buffer: it yields
//! `Ok(None)` until a complete header and payload have accumulated, so
//! bytes may arrive in arbitrarily small chunks (down to one at a
//! time) and a frame is only ever surfaced whole. The `size` field is
//! validated as soon as the 16 header bytes are available and before
//! any payload is reserved or consumed.
//!
//! The encoder writes header and payload into the output buffer in a
//! single call, so `send` on a framed sink flushes each frame as one
//! unit — the peer never observes a partial frame as a valid state.

use bytes::{Buf, BytesMut};

use crate::error::LinkError;
use crate::frame::{Frame, FrameFlags, FrameHeader, HEADER_LEN, MAX_FRAME_SIZE};

/// Codec for the screenlink wire format.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec enforcing the given payload bound.
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// The payload bound this codec enforces.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl tokio_util::codec::Decoder for FrameCodec {
    type Item = Frame;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LinkError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = FrameHeader::decode(&src[..HEADER_LEN])?;
        // Bounds check before reserving anything for the payload.
        header.validate(self.max_frame_size)?;

        let total = HEADER_LEN + header.size as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(header.size as usize).freeze();

        Ok(Some(Frame {
            timestamp_micros: header.timestamp_micros,
            flags: FrameFlags::from_bits_truncate(header.flags),
            payload,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, LinkError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            // Leftover bytes at EOF mean the peer closed mid-frame.
            None if !src.is_empty() => Err(LinkError::StreamClosed),
            None => Ok(None),
        }
    }
}

impl tokio_util::codec::Encoder<Frame> for FrameCodec {
    type Error = LinkError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), LinkError> {
        frame.header().validate(self.max_frame_size)?;

        dst.reserve(HEADER_LEN + frame.payload.len());
        dst.extend_from_slice(&frame.header().encode());
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::codec::{Decoder, Encoder};

    fn sample_frame() -> Frame {
        Frame::new(5000, FrameFlags::CODEC_CONFIG, vec![0xABu8; 100])
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut codec = FrameCodec::default();
        let frame = sample_frame();

        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN + 100);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let mut codec = FrameCodec::default();
        let frames = [
            Frame::new(0, FrameFlags::empty(), vec![1u8]),
            Frame::new(-42, FrameFlags::END_OF_STREAM, vec![9u8; 17]),
            Frame::config(vec![0x67, 0x42, 0x00, 0x1F, 0x68, 0xCE]),
            Frame::new(i64::MAX, FrameFlags::all(), vec![0u8; MAX_FRAME_SIZE]),
        ];

        for frame in frames {
            let mut buf = BytesMut::new();
            codec.encode(frame.clone(), &mut buf).unwrap();
            let decoded = codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let mut codec = FrameCodec::default();
        let frame = sample_frame();

        let mut wire = BytesMut::new();
        codec.encode(frame.clone(), &mut wire).unwrap();

        // Feed the exact same bytes one at a time.
        let mut buf = BytesMut::new();
        let mut decoded = None;
        for byte in wire.iter() {
            buf.extend_from_slice(&[*byte]);
            if let Some(f) = codec.decode(&mut buf).unwrap() {
                decoded = Some(f);
            }
        }

        assert_eq!(decoded.unwrap(), frame);
    }

    #[test]
    fn split_delivery_sixty_forty() {
        // 100-byte payload delivered as two writes of 60 and 40 bytes.
        let mut codec = FrameCodec::default();
        let frame = sample_frame();

        let mut wire = BytesMut::new();
        codec.encode(frame.clone(), &mut wire).unwrap();
        let wire = wire.freeze();

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&wire[..HEADER_LEN + 60]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&wire[HEADER_LEN + 60..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.size(), 100);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn incomplete_header_waits() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&[0u8; HEADER_LEN - 1][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_LEN - 1);
    }

    #[test]
    fn zero_size_header_is_protocol_error() {
        let mut codec = FrameCodec::default();
        let hdr = FrameHeader {
            size: 0,
            timestamp_micros: 0,
            flags: 0,
        };
        let mut buf = BytesMut::from(&hdr.encode()[..]);
        assert!(matches!(codec.decode(&mut buf), Err(LinkError::EmptyFrame)));
    }

    #[test]
    fn oversized_claim_fails_before_payload() {
        let mut codec = FrameCodec::default();
        let hdr = FrameHeader {
            size: 3_000_000,
            timestamp_micros: 0,
            flags: 0,
        };
        let mut buf = BytesMut::from(&hdr.encode()[..]);
        let before = buf.capacity();

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, LinkError::FrameTooLarge { size: 3_000_000, .. }));
        // No payload-sized reservation happened.
        assert_eq!(buf.capacity(), before);
    }

    #[test]
    fn encode_rejects_out_of_bounds() {
        let mut codec = FrameCodec::new(16);
        let mut buf = BytesMut::new();

        let too_big = Frame::new(0, FrameFlags::empty(), vec![0u8; 17]);
        assert!(codec.encode(too_big, &mut buf).is_err());

        let empty = Frame::new(0, FrameFlags::empty(), Vec::new());
        assert!(codec.encode(empty, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_eof_mid_frame_is_stream_closed() {
        let mut codec = FrameCodec::default();
        let frame = sample_frame();

        let mut wire = BytesMut::new();
        codec.encode(frame, &mut wire).unwrap();
        wire.truncate(HEADER_LEN + 50); // peer died halfway through

        assert!(matches!(
            codec.decode_eof(&mut wire),
            Err(LinkError::StreamClosed)
        ));
    }

    #[test]
    fn decode_eof_clean() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn back_to_back_frames() {
        let mut codec = FrameCodec::default();
        let a = Frame::new(1, FrameFlags::empty(), vec![1u8; 8]);
        let b = Frame::new(2, FrameFlags::END_OF_STREAM, vec![2u8; 8]);

        let mut buf = BytesMut::new();
        codec.encode(a.clone(), &mut buf).unwrap();
        codec.encode(b.clone(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), a);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), b);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}

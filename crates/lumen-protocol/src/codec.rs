//! Tokio codec for delimiter-terminated device frames.
//!
//! Every supported dialect terminates messages with a single delimiter
//! byte (`\r` for the ASCII dialect, ETX for the binary dialect).
//! [`FrameCodec`] splits the inbound byte stream on that delimiter and
//! hands each frame (delimiter stripped) to the strategy's `decode`.
//! Outbound frames are already fully framed by the strategy, so encoding
//! is a passthrough write.
//!
//! ```text
//! TCP stream -> Decoder -> Bytes frame -> ProtocolStrategy::decode
//! ProtocolStrategy::frame -> Bytes -> Encoder -> TCP stream
//! ```
//!
//! # DoS protection
//!
//! A buffer that grows past `max_frame_size` without a delimiter is
//! discarded and reported as an error. Serial-to-TCP bridges on noisy
//! links can emit long runs of garbage; dropping the run keeps memory
//! bounded and the decoder recoverable.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use lumen_core::{Error, Result};

/// Default maximum frame size in bytes.
///
/// Device replies are tens of bytes; 4 KB leaves generous headroom for
/// verbose error-text replies while bounding garbage runs.
const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024;

/// Splits a byte stream into delimiter-terminated frames.
#[derive(Debug)]
pub struct FrameCodec {
    /// Frame delimiter byte for the active dialect.
    delimiter: u8,

    /// Maximum bytes buffered before the pending run is discarded.
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec for the given delimiter with the default size cap.
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a codec with a custom maximum frame size.
    pub fn with_max_frame_size(delimiter: u8, max_frame_size: usize) -> Self {
        Self {
            delimiter,
            max_frame_size,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // Frames shorter than the delimiter alone are dropped here so the
        // interpreter never sees empty noise between delimiters.
        loop {
            match src.iter().position(|b| *b == self.delimiter) {
                Some(0) => {
                    src.advance(1);
                }
                Some(pos) => {
                    let frame = src.split_to(pos).freeze();
                    src.advance(1); // delimiter
                    return Ok(Some(frame));
                }
                None => {
                    if src.len() > self.max_frame_size {
                        let size = src.len();
                        src.clear();
                        return Err(Error::FrameTooLarge {
                            size,
                            max_size: self.max_frame_size,
                        });
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: item.len(),
                max_size: self.max_frame_size,
            });
        }

        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_frame() {
        let mut codec = FrameCodec::new(b'\r');
        let mut buffer = BytesMut::from(&b"POWR ON\r"[..]);

        let frame = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(frame.as_ref(), b"POWR ON");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_partial_frame() {
        let mut codec = FrameCodec::new(b'\r');
        let mut buffer = BytesMut::from(&b"POWR"[..]);

        assert!(codec.decode(&mut buffer).unwrap().is_none());
        assert_eq!(buffer.as_ref(), b"POWR"); // kept for next read
    }

    #[test]
    fn test_decode_multiple_frames() {
        let mut codec = FrameCodec::new(b'\r');
        let mut buffer = BytesMut::from(&b"OK\rAVOL 12\r"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().as_ref(), b"OK");
        assert_eq!(
            codec.decode(&mut buffer).unwrap().unwrap().as_ref(),
            b"AVOL 12"
        );
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_decode_skips_empty_frames() {
        let mut codec = FrameCodec::new(b'\r');
        let mut buffer = BytesMut::from(&b"\r\r\rOK\r"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().as_ref(), b"OK");
    }

    #[test]
    fn test_decode_etx_delimiter() {
        let mut codec = FrameCodec::new(0x03);
        let mut buffer = BytesMut::from(&b"\x02PW1 D8\x03"[..]);

        let frame = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(frame.as_ref(), b"\x02PW1 D8");
    }

    #[test]
    fn test_decode_oversize_run_discarded() {
        let mut codec = FrameCodec::with_max_frame_size(b'\r', 16);
        let mut buffer = BytesMut::from(&[b'A'; 32][..]);

        let result = codec.decode(&mut buffer);
        assert!(matches!(result, Err(Error::FrameTooLarge { .. })));

        // Decoder recovers once fresh delimited data arrives.
        buffer.extend_from_slice(b"OK\r");
        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap().as_ref(), b"OK");
    }

    #[test]
    fn test_encode_passthrough() {
        let mut codec = FrameCodec::new(b'\r');
        let mut buffer = BytesMut::new();

        codec
            .encode(Bytes::from_static(b"POWR ON\r"), &mut buffer)
            .unwrap();
        assert_eq!(buffer.as_ref(), b"POWR ON\r");
    }

    #[test]
    fn test_encode_oversize_rejected() {
        let mut codec = FrameCodec::with_max_frame_size(b'\r', 4);
        let mut buffer = BytesMut::new();

        let result = codec.encode(Bytes::from_static(b"TOO LONG\r"), &mut buffer);
        assert!(matches!(result, Err(Error::FrameTooLarge { .. })));
    }
}

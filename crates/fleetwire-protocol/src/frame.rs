//! Frame boundaries: where one message ends and the next begins.
//!
//! TCP delivers a byte stream with no message boundaries, so both ends
//! of a channel must agree on a framing rule. Two rules are deployed in
//! the fleet and either works as long as a channel uses one
//! consistently:
//!
//! - [`Framing::Newline`] — each message is compact JSON (which never
//!   contains a raw `0x0A` byte) followed by a single `\n`.
//! - [`Framing::LengthPrefixed`] — a 4-byte big-endian length, then
//!   exactly that many payload bytes.
//!
//! The decoder here is deliberately sans-I/O: [`FrameDecoder::push`]
//! accepts bytes in whatever chunks the network produced (down to one
//! byte at a time) and [`FrameDecoder::try_frame`] yields complete
//! frames. The transport layer owns the socket and the blocking; this
//! module owns the boundary guarantee: N encoded frames in, exactly N
//! payloads out, in order, byte-for-byte.

use crate::ProtocolError;

/// Default cap on a single frame's payload. The source system capped
/// messages in the tens of megabytes; 16 MiB leaves headroom for the
/// largest fleet snapshots while bounding a hostile length prefix.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// The framing rule used on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Payload bytes followed by one `\n`. The payload must not contain
    /// a raw newline — compact JSON never does.
    #[default]
    Newline,
    /// 4-byte big-endian payload length, then the payload.
    LengthPrefixed,
}

/// Wraps one payload into one frame.
///
/// # Errors
/// - [`ProtocolError::InvalidMessage`] if newline framing is asked to
///   carry a payload containing the delimiter byte.
/// - [`ProtocolError::FrameTooLarge`] if the payload exceeds `max_len`
///   (or, for length prefixes, `u32::MAX`).
pub fn encode_frame(
    framing: Framing,
    payload: &[u8],
    max_len: usize,
) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > max_len {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: max_len,
        });
    }
    match framing {
        Framing::Newline => {
            if payload.contains(&b'\n') {
                return Err(ProtocolError::InvalidMessage(
                    "newline-framed payload contains a raw newline".to_string(),
                ));
            }
            let mut frame = Vec::with_capacity(payload.len() + 1);
            frame.extend_from_slice(payload);
            frame.push(b'\n');
            Ok(frame)
        }
        Framing::LengthPrefixed => {
            let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::FrameTooLarge {
                len: payload.len(),
                max: u32::MAX as usize,
            })?;
            let mut frame = Vec::with_capacity(payload.len() + 4);
            frame.extend_from_slice(&len.to_be_bytes());
            frame.extend_from_slice(payload);
            Ok(frame)
        }
    }
}

/// Incremental frame decoder.
///
/// Feed it bytes as they arrive; take frames as they complete. Holds at
/// most one partial frame plus whatever complete frames haven't been
/// taken yet.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    max_len: usize,
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// A decoder with the default frame-length cap.
    pub fn new(framing: Framing) -> Self {
        Self::with_max_len(framing, DEFAULT_MAX_FRAME_LEN)
    }

    /// A decoder with an explicit frame-length cap.
    pub fn with_max_len(framing: Framing, max_len: usize) -> Self {
        FrameDecoder {
            framing,
            max_len,
            buf: Vec::new(),
        }
    }

    /// Appends newly received bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// True when no partial frame is buffered.
    ///
    /// The transport uses this to tell a clean close (EOF between
    /// frames) from a truncated one (EOF mid-frame).
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Takes the next complete frame's payload, if one is buffered.
    ///
    /// `Ok(None)` means more bytes are needed. Call again after every
    /// [`push`](Self::push) until it returns `None` — one push may
    /// complete several frames.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLarge`] if a length prefix announces
    /// more than the cap, or a newline frame grows past it without a
    /// delimiter. After an error the stream is unrecoverable; the caller
    /// must drop the connection.
    pub fn try_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        match self.framing {
            Framing::Newline => match self.buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let mut frame: Vec<u8> = self.buf.drain(..=pos).collect();
                    frame.pop(); // the delimiter
                    Ok(Some(frame))
                }
                None if self.buf.len() > self.max_len => Err(ProtocolError::FrameTooLarge {
                    len: self.buf.len(),
                    max: self.max_len,
                }),
                None => Ok(None),
            },
            Framing::LengthPrefixed => {
                if self.buf.len() < 4 {
                    return Ok(None);
                }
                let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
                    as usize;
                if len > self.max_len {
                    return Err(ProtocolError::FrameTooLarge {
                        len,
                        max: self.max_len,
                    });
                }
                if self.buf.len() < 4 + len {
                    return Ok(None);
                }
                let frame = self.buf[4..4 + len].to_vec();
                self.buf.drain(..4 + len);
                Ok(Some(frame))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut FrameDecoder) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        while let Some(frame) = decoder.try_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_round_trip_both_framings() {
        for framing in [Framing::Newline, Framing::LengthPrefixed] {
            let payload = br#"{"name":"login","email":"a@b.com"}"#;
            let frame = encode_frame(framing, payload, DEFAULT_MAX_FRAME_LEN).unwrap();
            let mut decoder = FrameDecoder::new(framing);
            decoder.push(&frame);
            assert_eq!(drain(&mut decoder), vec![payload.to_vec()]);
            assert!(decoder.is_empty());
        }
    }

    #[test]
    fn test_single_byte_chunks_decode_identically() {
        for framing in [Framing::Newline, Framing::LengthPrefixed] {
            let payload = "{\"note\":\"multibyte ° ü 🛴\"}".as_bytes();
            let frame = encode_frame(framing, payload, DEFAULT_MAX_FRAME_LEN).unwrap();

            let mut decoder = FrameDecoder::new(framing);
            for byte in &frame {
                decoder.push(std::slice::from_ref(byte));
            }
            assert_eq!(drain(&mut decoder), vec![payload.to_vec()]);
        }
    }

    #[test]
    fn test_n_frames_in_n_payloads_out_in_order() {
        for framing in [Framing::Newline, Framing::LengthPrefixed] {
            let payloads: Vec<Vec<u8>> = (0..5)
                .map(|i| format!("{{\"seq\":{i}}}").into_bytes())
                .collect();
            let mut wire = Vec::new();
            for payload in &payloads {
                wire.extend(encode_frame(framing, payload, DEFAULT_MAX_FRAME_LEN).unwrap());
            }

            // Deliver the whole stream in one push and in ragged chunks.
            for chunk_len in [wire.len(), 3] {
                let mut decoder = FrameDecoder::new(framing);
                for chunk in wire.chunks(chunk_len) {
                    decoder.push(chunk);
                }
                assert_eq!(drain(&mut decoder), payloads);
                assert!(decoder.is_empty());
            }
        }
    }

    #[test]
    fn test_empty_payload_is_a_valid_frame() {
        for framing in [Framing::Newline, Framing::LengthPrefixed] {
            let frame = encode_frame(framing, b"", DEFAULT_MAX_FRAME_LEN).unwrap();
            let mut decoder = FrameDecoder::new(framing);
            decoder.push(&frame);
            assert_eq!(drain(&mut decoder), vec![Vec::<u8>::new()]);
        }
    }

    #[test]
    fn test_partial_frame_stays_buffered() {
        let mut decoder = FrameDecoder::new(Framing::LengthPrefixed);
        decoder.push(&[0, 0]); // half a length prefix
        assert!(decoder.try_frame().unwrap().is_none());
        assert!(!decoder.is_empty());

        let mut decoder = FrameDecoder::new(Framing::Newline);
        decoder.push(b"{\"name\":");
        assert!(decoder.try_frame().unwrap().is_none());
        assert!(!decoder.is_empty());
    }

    #[test]
    fn test_newline_payload_with_embedded_delimiter_is_rejected() {
        let err = encode_frame(Framing::Newline, b"bad\npayload", DEFAULT_MAX_FRAME_LEN)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        let mut decoder = FrameDecoder::with_max_len(Framing::LengthPrefixed, 1024);
        decoder.push(&(10_000u32).to_be_bytes());
        let err = decoder.try_frame().unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { len: 10_000, .. }));
    }

    #[test]
    fn test_unterminated_newline_frame_past_cap_is_rejected() {
        let mut decoder = FrameDecoder::with_max_len(Framing::Newline, 16);
        decoder.push(&[b'x'; 32]);
        let err = decoder.try_frame().unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn test_encode_respects_max_len() {
        let err = encode_frame(Framing::LengthPrefixed, &[0u8; 32], 16).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { len: 32, max: 16 }));
    }
}

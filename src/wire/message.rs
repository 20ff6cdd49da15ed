use bytes::{BufMut, Bytes, BytesMut};

use super::{FrameError, FrameHeader, HEADER_LEN, MessageType};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// User id 0 is never a real user: it marks "no recipient" on the way in and
/// the gateway itself on the way out.
pub const SERVER_USER_ID: u64 = 0;

// -----------------------------------------------------------------------------
// ----- Message ---------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub from_user_id: u64,
    pub to_user_id: u64,
    pub message_type: MessageType,
    pub payload: Bytes,
}

// -----------------------------------------------------------------------------
// ----- Message: Static -------------------------------------------------------

impl Message {
    pub fn new(
        from_user_id: u64,
        to_user_id: u64,
        message_type: MessageType,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            from_user_id,
            to_user_id,
            message_type,
            payload: payload.into(),
        }
    }

    /// Decode a frame from a borrowed buffer, copying the payload out.
    ///
    /// Never panics. Fails when the buffer is shorter than the header or when
    /// the declared payload runs past the end of the buffer. Bytes after the
    /// declared payload are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        let header = Self::check(buf)?;
        let payload = Bytes::copy_from_slice(&buf[HEADER_LEN..header.total_len()]);

        Ok(Self::from_header(header, payload))
    }

    /// Zero-copy variant of `decode` for frames already split off the inbox.
    pub fn decode_frame(frame: Bytes) -> Result<Self, FrameError> {
        let header = Self::check(&frame)?;
        let payload = frame.slice(HEADER_LEN..header.total_len());

        Ok(Self::from_header(header, payload))
    }
}

// -----------------------------------------------------------------------------
// ----- Message: Public -------------------------------------------------------

impl Message {
    /// Build the wire frame. Allocates exactly `21 + payload.len()` bytes.
    ///
    /// The payload length is written as a u32; callers own the 4 GiB bound.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());

        buf.put_u64(self.from_user_id);
        buf.put_u64(self.to_user_id);
        buf.put_u8(self.message_type.as_byte());
        buf.put_u32(self.payload.len() as u32);
        buf.extend_from_slice(&self.payload);

        buf.freeze()
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Lossy view of the payload for logs.
    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

// -----------------------------------------------------------------------------
// ----- Message: Private ------------------------------------------------------

impl Message {
    fn check(buf: &[u8]) -> Result<FrameHeader, FrameError> {
        let header = FrameHeader::parse(buf)?;

        let available = buf.len() - HEADER_LEN;
        if header.payload_len() > available {
            return Err(FrameError::PayloadOverrun {
                declared: header.payload_len(),
                available,
            });
        }

        Ok(header)
    }

    fn from_header(header: FrameHeader, payload: Bytes) -> Self {
        Self {
            from_user_id: header.from_user_id,
            to_user_id: header.to_user_id,
            message_type: header.message_type,
            payload,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message::new(7, 9, MessageType::Text, Bytes::from_static(b"hello"))
    }

    #[test]
    fn encode_layout() {
        let frame = sample().encode();
        assert_eq!(frame.len(), HEADER_LEN + 5);
        assert_eq!(&frame[0..8], &7u64.to_be_bytes());
        assert_eq!(&frame[8..16], &9u64.to_be_bytes());
        assert_eq!(frame[16], 1);
        assert_eq!(&frame[17..21], &5u32.to_be_bytes());
        assert_eq!(&frame[21..], b"hello");
    }

    #[test]
    fn decode_inverts_encode() {
        let cases = [
            sample(),
            Message::default(),
            Message::new(u64::MAX, 0, MessageType::Unknown(250), vec![0u8; 4096]),
            Message::new(1, 2, MessageType::Ping, Bytes::new()),
        ];

        for msg in cases {
            assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
            assert_eq!(Message::decode_frame(msg.encode()).unwrap(), msg);
        }
    }

    #[test]
    fn short_buffer_is_never_a_message() {
        let frame = sample().encode();
        for cut in 0..HEADER_LEN {
            let err = Message::decode(&frame[..cut]).unwrap_err();
            assert_eq!(err, FrameError::HeaderTooShort { got: cut });
        }
    }

    #[test]
    fn overrun_payload_is_never_a_message() {
        let frame = sample().encode();
        for cut in HEADER_LEN..frame.len() {
            let err = Message::decode(&frame[..cut]).unwrap_err();
            assert_eq!(
                err,
                FrameError::PayloadOverrun {
                    declared: 5,
                    available: cut - HEADER_LEN,
                }
            );
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut buf = sample().encode().to_vec();
        buf.extend_from_slice(b"junk");
        assert_eq!(Message::decode(&buf).unwrap(), sample());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

// Fixed 21-byte frame header: from(8) to(8) type(1) payload_len(4), big-endian.

use super::{FrameError, MessageType};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const HEADER_LEN: usize = 8 + 8 + 1 + 4;

// -----------------------------------------------------------------------------
// ----- FrameHeader -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub from_user_id: u64,
    pub to_user_id: u64,
    pub message_type: MessageType,
    pub payload_len: u32,
}

// -----------------------------------------------------------------------------
// ----- FrameHeader: Static ---------------------------------------------------

impl FrameHeader {
    /// Cheap, reads the header without consuming anything. `None` until all 21
    /// header bytes are present.
    #[inline]
    pub fn peek(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }

        Some(Self::read(buf))
    }

    /// Like `peek`, but reports the shortfall instead of waiting for more.
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        Self::peek(buf).ok_or(FrameError::HeaderTooShort { got: buf.len() })
    }
}

// -----------------------------------------------------------------------------
// ----- FrameHeader: Public ---------------------------------------------------

impl FrameHeader {
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    /// Header plus declared payload.
    #[inline]
    pub fn total_len(&self) -> usize {
        HEADER_LEN + self.payload_len()
    }
}

// -----------------------------------------------------------------------------
// ----- FrameHeader: Private --------------------------------------------------

impl FrameHeader {
    fn read(buf: &[u8]) -> Self {
        let mut from = [0u8; 8];
        let mut to = [0u8; 8];
        from.copy_from_slice(&buf[0..8]);
        to.copy_from_slice(&buf[8..16]);

        Self {
            from_user_id: u64::from_be_bytes(from),
            to_user_id: u64::from_be_bytes(to),
            message_type: MessageType::from_byte(buf[16]),
            payload_len: u32::from_be_bytes([buf[17], buf[18], buf[19], buf[20]]),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

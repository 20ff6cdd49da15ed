use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::wire::{FrameError, FrameHeader, Message};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SCRATCH_CAPACITY_HINT: usize = 4096;

// -----------------------------------------------------------------------------
// ----- FrameAssembler --------------------------------------------------------

/// Stream reassembly for one connection.
///
/// Bytes are appended as they arrive; a frame is only split off the inbox once
/// its header and its whole declared payload are buffered. Nothing is consumed
/// for a partial frame.
#[derive(Debug)]
pub struct FrameAssembler {
    inbox: BytesMut,
    max_payload_len: usize,
}

// -----------------------------------------------------------------------------
// ----- FrameAssembler: Static ------------------------------------------------

impl FrameAssembler {
    pub fn new(max_payload_len: usize) -> Self {
        Self {
            inbox: BytesMut::with_capacity(SCRATCH_CAPACITY_HINT),
            max_payload_len,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- FrameAssembler: Public ------------------------------------------------

impl FrameAssembler {
    pub async fn read_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.inbox.reserve(SCRATCH_CAPACITY_HINT);
        reader.read_buf(&mut self.inbox).await
    }

    #[cfg(test)]
    pub fn extend(&mut self, bytes: &[u8]) {
        self.inbox.extend_from_slice(bytes);
    }

    #[cfg(test)]
    pub fn buffered(&self) -> usize {
        self.inbox.len()
    }

    /// Split off the next complete frame, if one is fully buffered.
    ///
    /// The size limit is checked against the header alone, so an oversized
    /// frame is rejected before any of its payload is held in memory.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, FrameError> {
        let Some(header) = FrameHeader::peek(&self.inbox) else {
            return Ok(None);
        };

        if header.payload_len() > self.max_payload_len {
            return Err(FrameError::PayloadTooLarge {
                declared: header.payload_len(),
                max: self.max_payload_len,
            });
        }

        let total_len = header.total_len();
        if self.inbox.len() < total_len {
            self.inbox.reserve(total_len - self.inbox.len());
            return Ok(None);
        }

        Ok(Some(self.inbox.split_to(total_len).freeze()))
    }

    /// `next_frame` followed by decode.
    pub fn next_message(&mut self) -> Result<Option<Message>, FrameError> {
        match self.next_frame()? {
            Some(frame) => Message::decode_frame(frame).map(Some),
            None => Ok(None),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

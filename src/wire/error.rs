use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- FrameError ------------------------------------------------------------

/// Framing faults. All of them are fatal for the connection that produced them:
/// once the stream is out of step there is no way to find the next header.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame header too short: got {got} bytes, need 21")]
    HeaderTooShort { got: usize },

    #[error("declared payload of {declared} bytes exceeds the {available} available")]
    PayloadOverrun { declared: usize, available: usize },

    #[error("declared payload of {declared} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { declared: usize, max: usize },
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

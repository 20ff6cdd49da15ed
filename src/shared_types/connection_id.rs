use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// -----------------------------------------------------------------------------
// ----- Global Counter --------------------------------------------------------

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// -----------------------------------------------------------------------------
// ----- ConnectionId ----------------------------------------------------------

/// Process-unique id for an accepted connection. Lets the session registry
/// tell "the same user on the same socket" apart from a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

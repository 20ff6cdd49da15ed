use std::collections::HashMap;
use std::fmt::Debug;

use crate::config::PeersConfig;

// -----------------------------------------------------------------------------
// ----- Directory -------------------------------------------------------------

/// Answers "which gateway holds this user's session?".
///
/// Returns the name of a peer in the `PeerLinkPool`, or `None` when no gateway
/// is known. A shared key-value store would implement this in a multi-gateway
/// deployment; `StaticDirectory` serves a fixed table from config.
pub trait Directory: Send + Sync + Debug {
    fn locate(&self, user_id: u64) -> Option<String>;
}

// -----------------------------------------------------------------------------
// ----- StaticDirectory -------------------------------------------------------

/// Per-user routes first, then a catch-all peer.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    routes: HashMap<u64, String>,
    default_peer: Option<String>,
}

impl StaticDirectory {
    pub fn new(routes: HashMap<u64, String>, default_peer: Option<String>) -> Self {
        Self {
            routes,
            default_peer,
        }
    }

    pub fn from_config(config: &PeersConfig) -> Self {
        Self::new(config.routes.clone(), config.default_peer.clone())
    }

    /// Every user lives on `peer`.
    pub fn single(peer: impl Into<String>) -> Self {
        Self::new(HashMap::new(), Some(peer.into()))
    }
}

impl Directory for StaticDirectory {
    fn locate(&self, user_id: u64) -> Option<String> {
        self.routes
            .get(&user_id)
            .or(self.default_peer.as_ref())
            .cloned()
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

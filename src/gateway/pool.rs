use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::PeerRecord;
use crate::peer::PeerLink;
use crate::wire::Message;

// -----------------------------------------------------------------------------
// ----- PeerLinkPool ----------------------------------------------------------

/// One long-lived outbound link per configured peer gateway.
///
/// Each link sits behind its own async mutex, so a stalled write to one peer
/// only blocks forwards to that same peer.
#[derive(Debug)]
pub struct PeerLinkPool {
    slots: HashMap<String, Arc<PeerSlot>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStatus {
    pub name: String,
    pub addr: String,
    pub connected: bool,
}

impl PeerLinkPool {
    pub fn new(peers: Vec<PeerRecord>) -> Self {
        let mut slots = HashMap::with_capacity(peers.len());
        for peer in peers {
            let name = peer.name.clone();
            slots.insert(name, Arc::new(PeerSlot::new(peer)));
        }

        Self { slots }
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Dial every configured peer. Failures are logged; those links are
    /// retried on their first forward.
    pub async fn connect_all(&self) {
        for slot in self.slots.values() {
            if let Err(err) = slot.ensure_connected().await {
                warn!("{err}; will retry on first forward");
            }
        }
    }

    /// Encode `message` unchanged and write it to `peer`.
    pub async fn forward(&self, message: &Message, peer: &str) -> Result<(), PeerError> {
        let slot = self.slots.get(peer).ok_or_else(|| PeerError::UnknownPeer {
            name: peer.to_string(),
        })?;

        slot.send(&message.encode()).await?;

        debug!(
            "forwarded {:?} from {} to {} via peer {}",
            message.message_type, message.from_user_id, message.to_user_id, peer
        );
        Ok(())
    }

    pub async fn snapshot(&self) -> Vec<PeerStatus> {
        let mut stats = Vec::with_capacity(self.slots.len());
        for slot in self.slots.values() {
            stats.push(slot.status().await);
        }
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    pub async fn close_all(&self) {
        for slot in self.slots.values() {
            slot.close().await;
        }
    }
}

// -----------------------------------------------------------------------------
// ----- PeerSlot --------------------------------------------------------------

#[derive(Debug)]
struct PeerSlot {
    peer: PeerRecord,
    link: Mutex<Option<PeerLink>>,
}

impl PeerSlot {
    fn new(peer: PeerRecord) -> Self {
        Self {
            peer,
            link: Mutex::new(None),
        }
    }

    async fn ensure_connected(&self) -> Result<(), PeerError> {
        let mut link = self.link.lock().await;
        if link.is_none() {
            *link = Some(self.dial().await?);
        }
        Ok(())
    }

    async fn send(&self, frame: &[u8]) -> Result<(), PeerError> {
        let mut guard = self.link.lock().await;

        // A write into a half-closed socket still succeeds locally; check first.
        if guard.as_ref().is_some_and(PeerLink::is_closed) {
            info!("peer link to {} closed by the far side; redialing", self.peer.name);
            *guard = None;
        }

        if guard.is_none() {
            *guard = Some(self.dial().await?);
        }

        let Some(link) = guard.as_mut() else {
            return Err(self.connect_error(std::io::ErrorKind::NotConnected.into()));
        };

        if let Err(source) = link.send(frame).await {
            // The stream is in an unknown state; redial next time.
            *guard = None;
            return Err(PeerError::Write {
                name: self.peer.name.clone(),
                source,
            });
        }

        Ok(())
    }

    async fn dial(&self) -> Result<PeerLink, PeerError> {
        let addr = self.peer.addr();
        let link = PeerLink::connect(&addr)
            .await
            .map_err(|e| self.connect_error(e))?;

        info!("peer link to {} ({addr}) established", self.peer.name);
        Ok(link)
    }

    async fn status(&self) -> PeerStatus {
        PeerStatus {
            name: self.peer.name.clone(),
            addr: self.peer.addr(),
            connected: self
                .link
                .lock()
                .await
                .as_ref()
                .is_some_and(|link| !link.is_closed()),
        }
    }

    async fn close(&self) {
        if let Some(mut link) = self.link.lock().await.take() {
            if let Err(err) = link.shutdown().await {
                debug!("closing peer link {}: {err}", self.peer.name);
            }
        }
    }

    fn connect_error(&self, source: std::io::Error) -> PeerError {
        PeerError::Connect {
            name: self.peer.name.clone(),
            addr: self.peer.addr(),
            source,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("no peer link configured for '{name}'")]
    UnknownPeer { name: String },

    #[error("peer '{name}' ({addr}) unreachable: {source}")]
    Connect {
        name: String,
        addr: String,
        source: std::io::Error,
    },

    #[error("write to peer '{name}' failed: {source}")]
    Write {
        name: String,
        source: std::io::Error,
    },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

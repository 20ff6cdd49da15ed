use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{Directory, PeerError, PeerLinkPool, SessionRegistry};
use crate::frontend::DeliveryError;
use crate::wire::Message;

// -----------------------------------------------------------------------------
// ----- Router ----------------------------------------------------------------

/// Local-or-forward decision for application messages.
#[derive(Debug)]
pub struct Router {
    registry: Arc<SessionRegistry>,
    directory: Arc<dyn Directory>,
    peers: Arc<PeerLinkPool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Written to a connection on this gateway.
    Delivered { to_user_id: u64 },

    /// Handed to a peer gateway.
    Forwarded { peer: String },

    /// `toUserID` was 0; nothing to deliver.
    Informational,
}

impl Router {
    pub fn new(
        registry: Arc<SessionRegistry>,
        directory: Arc<dyn Directory>,
        peers: Arc<PeerLinkPool>,
    ) -> Self {
        Self {
            registry,
            directory,
            peers,
        }
    }

    /// Deliver locally when the recipient has a session here, otherwise
    /// forward to the peer the directory names. A failed local write is
    /// reported as is; it never falls through to forwarding.
    pub async fn route(&self, message: &Message) -> Result<RouteOutcome, RouteError> {
        if message.to_user_id == 0 {
            return Ok(RouteOutcome::Informational);
        }

        if let Some(outcome) = self.deliver_local(message).await? {
            return Ok(outcome);
        }

        let to = message.to_user_id;
        let peer = self
            .directory
            .locate(to)
            .ok_or(RouteError::NoRoute { to_user_id: to })?;

        self.peers.forward(message, &peer).await?;

        Ok(RouteOutcome::Forwarded { peer })
    }

    /// Local half of `route`. `Ok(None)` means the recipient has no
    /// authenticated session on this gateway.
    pub async fn deliver_local(
        &self,
        message: &Message,
    ) -> Result<Option<RouteOutcome>, RouteError> {
        let to = message.to_user_id;

        let Some(connection) = self.registry.lookup(to) else {
            return Ok(None);
        };

        connection
            .send(message.encode())
            .await
            .map_err(|source| RouteError::LocalDelivery {
                to_user_id: to,
                source,
            })?;

        debug!(
            "delivered {:?} from {} to {} on connection {}",
            message.message_type,
            message.from_user_id,
            to,
            connection.id()
        );

        Ok(Some(RouteOutcome::Delivered { to_user_id: to }))
    }
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("delivery to user {to_user_id} failed: {source}")]
    LocalDelivery {
        to_user_id: u64,
        source: DeliveryError,
    },

    #[error("no gateway known for user {to_user_id}")]
    NoRoute { to_user_id: u64 },

    #[error(transparent)]
    Peer(#[from] PeerError),
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeerRecord;
    use crate::frontend::ConnectionHandle;
    use crate::gateway::StaticDirectory;
    use crate::shared_types::ConnectionId;
    use crate::wire::{HEADER_LEN, MessageType};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn text(from: u64, to: u64, body: &'static [u8]) -> Message {
        Message::new(from, to, MessageType::Text, body)
    }

    fn router(registry: Arc<SessionRegistry>, peers: PeerLinkPool, dir: StaticDirectory) -> Router {
        Router::new(registry, Arc::new(dir), Arc::new(peers))
    }

    /// A registered connection whose "socket" acknowledges every write.
    fn fake_connection(
        registry: &SessionRegistry,
        user_id: u64,
    ) -> tokio::sync::mpsc::UnboundedReceiver<bytes::Bytes> {
        let (handle, mut rx) = ConnectionHandle::channel(ConnectionId::next(), "fake");
        registry.register(user_id, &handle);

        let (seen_tx, seen_rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(out) = rx.recv().await {
                let _ = seen_tx.send(out.frame);
                let _ = out.ack.send(Ok(()));
            }
        });
        seen_rx
    }

    #[tokio::test]
    async fn zero_recipient_is_informational() {
        let r = router(
            Arc::new(SessionRegistry::new()),
            PeerLinkPool::empty(),
            StaticDirectory::default(),
        );
        let outcome = r.route(&text(1, 0, b"hi")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Informational);
    }

    #[tokio::test]
    async fn local_recipient_gets_exactly_one_write() {
        let registry = Arc::new(SessionRegistry::new());
        let mut b_frames = fake_connection(&registry, 2);

        // Peer "gw-b" points at nothing; touching it would fail the route.
        let peers = PeerLinkPool::new(vec![PeerRecord {
            name: "gw-b".into(),
            host: "127.0.0.1".into(),
            port: 1,
        }]);
        let r = router(registry, peers, StaticDirectory::single("gw-b"));

        let msg = text(1, 2, b"local");
        let outcome = r.route(&msg).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Delivered { to_user_id: 2 });

        let frame = b_frames.recv().await.unwrap();
        assert_eq!(Message::decode(&frame).unwrap(), msg);
        assert!(b_frames.try_recv().is_err());
        assert!(!r.peers.snapshot().await[0].connected);
    }

    #[tokio::test]
    async fn failed_local_write_does_not_forward() {
        let registry = Arc::new(SessionRegistry::new());
        let (handle, rx) = ConnectionHandle::channel(ConnectionId::next(), "dead");
        registry.register(2, &handle);
        drop(rx);

        let r = router(registry, PeerLinkPool::empty(), StaticDirectory::single("gw-b"));
        let err = r.route(&text(1, 2, b"lost")).await.unwrap_err();
        assert!(matches!(err, RouteError::LocalDelivery { to_user_id: 2, .. }));
    }

    #[tokio::test]
    async fn missing_recipient_is_forwarded_unchanged() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peers = PeerLinkPool::new(vec![PeerRecord {
            name: "gw-b".into(),
            host: "127.0.0.1".into(),
            port,
        }]);

        let r = router(
            Arc::new(SessionRegistry::new()),
            peers,
            StaticDirectory::single("gw-b"),
        );
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });

        let msg = text(1, 99, b"remote");
        let outcome = r.route(&msg).await.unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::Forwarded {
                peer: "gw-b".into()
            }
        );

        let mut inbound = accept.await.unwrap();
        let expected = msg.encode();
        let mut buf = vec![0u8; HEADER_LEN + expected.len()];
        inbound.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[HEADER_LEN..], &expected[..]);
    }

    #[tokio::test]
    async fn no_directory_entry_is_no_route() {
        let r = router(
            Arc::new(SessionRegistry::new()),
            PeerLinkPool::empty(),
            StaticDirectory::default(),
        );
        let err = r.route(&text(1, 5, b"?")).await.unwrap_err();
        assert!(matches!(err, RouteError::NoRoute { to_user_id: 5 }));
    }

    #[tokio::test]
    async fn unconfigured_peer_is_reported() {
        let r = router(
            Arc::new(SessionRegistry::new()),
            PeerLinkPool::empty(),
            StaticDirectory::single("ghost"),
        );
        let err = r.route(&text(1, 5, b"?")).await.unwrap_err();
        assert!(matches!(err, RouteError::Peer(PeerError::UnknownPeer { .. })));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

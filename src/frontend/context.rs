use std::net::IpAddr;

use bytes::Bytes;
use tracing::trace;

use crate::frontend::ConnectionHandle;
use crate::gateway::SessionLease;
use crate::shared_types::AuthStage;

// -----------------------------------------------------------------------------
// ----- ConnectionContext -----------------------------------------------------

/// Per-connection state, built on accept and dropped exactly once on close.
/// Dropping it releases every session this connection bound.
#[derive(Debug)]
pub(crate) struct ConnectionContext {
    pub(crate) stage: AuthStage,
    pub(crate) connection: ConnectionHandle,
    remote_ip: IpAddr,
    leases: Vec<SessionLease>,
}

impl ConnectionContext {
    pub(crate) fn new(connection: ConnectionHandle, remote_ip: IpAddr) -> Self {
        Self {
            stage: AuthStage::Unauthenticated,
            connection,
            remote_ip,
            leases: Vec::new(),
        }
    }

    pub(crate) fn remote_addr(&self) -> &str {
        self.connection.remote_addr()
    }

    pub(crate) fn remote_ip(&self) -> IpAddr {
        self.remote_ip
    }

    pub(crate) fn is_relay(&self) -> bool {
        self.stage == AuthStage::Relay
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        matches!(self.stage, AuthStage::Authenticated { .. })
    }

    /// User id for replies; 0 before authentication.
    pub(crate) fn reply_to(&self) -> u64 {
        self.stage.user_id().unwrap_or(0)
    }

    pub(crate) fn hold(&mut self, lease: SessionLease) {
        self.leases.push(lease);
    }

    pub(crate) fn held_user_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.leases.iter().map(SessionLease::user_id)
    }

    /// Write a status frame back to this client. Relay links never get one.
    pub(crate) async fn reply(&self, frame: Bytes) -> std::io::Result<()> {
        if self.is_relay() {
            trace!("suppressing reply on relay link {}", self.remote_addr());
            return Ok(());
        }

        self.connection.send(frame).await?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

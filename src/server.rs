use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::{Config, PeerRecord};
use crate::frontend::ClientConnection;
use crate::gateway::{Directory, PeerLinkPool, Router, SessionRegistry, StaticDirectory};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MAX_PAYLOAD_LEN: usize = 1024 * 1024;

// -----------------------------------------------------------------------------
// ----- GatewaySettings -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Close a connection after this long without inbound bytes.
    pub idle_timeout: Option<Duration>,

    /// Frames declaring a larger payload close the connection.
    pub max_payload_len: usize,

    /// Remote addresses allowed to open relay links. A relay hello from any
    /// other address is refused like a failed login.
    pub trusted_relays: HashSet<IpAddr>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            trusted_relays: HashSet::new(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Gateway ---------------------------------------------------------------

/// Everything the connection tasks share: the session registry, the router
/// and the peer links behind it.
#[derive(Debug)]
pub struct Gateway {
    settings: GatewaySettings,
    registry: Arc<SessionRegistry>,
    peers: Arc<PeerLinkPool>,
    router: Router,
}

// -----------------------------------------------------------------------------
// ----- Gateway: Static -------------------------------------------------------

impl Gateway {
    pub fn new(
        settings: GatewaySettings,
        peers: Vec<PeerRecord>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let peers = Arc::new(PeerLinkPool::new(peers));
        let router = Router::new(registry.clone(), directory, peers.clone());

        Self {
            settings,
            registry,
            peers,
            router,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let directory = Arc::new(StaticDirectory::from_config(&config.peers));
        Self::new(config.settings(), config.peers.peers.clone(), directory)
    }

    /// A gateway with no peers: every miss is unreachable.
    pub fn standalone(settings: GatewaySettings) -> Self {
        Self::new(settings, Vec::new(), Arc::new(StaticDirectory::default()))
    }
}

// -----------------------------------------------------------------------------
// ----- Gateway: Public -------------------------------------------------------

impl Gateway {
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn peers(&self) -> &Arc<PeerLinkPool> {
        &self.peers
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Accept connections until `shutdown` resolves, one task per connection,
    /// then close the peer links.
    pub async fn serve<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; no longer accepting connections");
                    break;
                }

                accept_res = listener.accept() => {
                    let (stream, peer) = match accept_res {
                        Ok(v) => v,
                        Err(e) => { error!("accept error: {e}"); continue; }
                    };

                    let _ = stream.set_nodelay(true);

                    let gateway = self.clone();
                    tokio::spawn(async move {
                        let conn = ClientConnection::new(stream, peer, gateway);

                        if let Err(e) = conn.serve().await {
                            error!("client {peer} error: {e}");
                        }
                    });
                }
            }
        }

        self.peers.close_all().await;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

use parking_lot::RwLock;
use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};

use super::{cli::CliConfig, peers::PeersConfig, types::LogLevel};
use crate::server::GatewaySettings;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static ROOT_CONFIG: OnceLock<Arc<RwLock<Config>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: LogLevel,
    pub idle_timeout: Option<Duration>,
    pub max_payload_len: usize,
    pub peers: PeersConfig,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// Async because the peers file is read with non-blocking IO.
    /// Panics on any error: do not start with a bad state.
    pub async fn init() {
        CliConfig::init();

        let peers = Self::load_peers()
            .await
            .unwrap_or_else(|e| panic!("failed to load peers config: {e}"));

        Self::store(peers);
    }

    pub fn snapshot() -> Config {
        Self::handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Public --------------------------------------------------------

impl Config {
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            idle_timeout: self.idle_timeout,
            max_payload_len: self.max_payload_len,
            trusted_relays: self.peers.trusted_relays(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Private -------------------------------------------------------

impl Config {
    async fn load_peers() -> Result<PeersConfig, super::PeersConfigError> {
        match CliConfig::snapshot().config_file_location {
            Some(path) => PeersConfig::from_file_async(&path).await,
            None => Ok(PeersConfig::default()),
        }
    }

    fn store(peers: PeersConfig) {
        let cli = CliConfig::snapshot();

        let next = Config {
            listen_addr: cli.listen_addr,
            log_level: cli.log_level,
            idle_timeout: cli.idle_timeout,
            max_payload_len: cli.max_payload_len,
            peers,
        };

        if let Some(handle) = ROOT_CONFIG.get() {
            *handle.write() = next;
        } else {
            let _ = ROOT_CONFIG.set(Arc::new(RwLock::new(next)));
        }
    }

    fn handle() -> Arc<RwLock<Config>> {
        ROOT_CONFIG
            .get()
            .expect("Config not initialized; call Config::init().await first")
            .clone()
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

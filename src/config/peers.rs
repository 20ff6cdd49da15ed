use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;

// -----------------------------------------------------------------------------
// ----- PeersConfig -----------------------------------------------------------

/// Peer gateways and the static user -> peer routing table.
#[derive(Debug, Clone, Default)]
pub struct PeersConfig {
    pub peers: Vec<PeerRecord>,
    pub routes: HashMap<u64, String>,
    pub default_peer: Option<String>,

    /// Extra addresses allowed to open relay links, for peers that dial out
    /// from an address other than the one they are listed under.
    pub relay_sources: Vec<IpAddr>,
}

// -----------------------------------------------------------------------------
// ----- PeersConfig: Static ---------------------------------------------------

impl PeersConfig {
    pub async fn from_file_async(path: &Path) -> Result<PeersConfig, PeersConfigError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| PeersConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<PeersConfig, PeersConfigError> {
        let doc: GatewayFile =
            toml::from_str(raw).map_err(|e| PeersConfigError::Toml { source: e })?;

        let mut names = HashSet::with_capacity(doc.peers.len());
        let mut peers = Vec::with_capacity(doc.peers.len());

        for entry in doc.peers {
            if entry.host.trim().is_empty() || entry.port == 0 {
                return Err(PeersConfigError::BadAddress { name: entry.name });
            }

            if !names.insert(entry.name.clone()) {
                return Err(PeersConfigError::DuplicatePeer { name: entry.name });
            }

            peers.push(PeerRecord {
                name: entry.name,
                host: entry.host,
                port: entry.port,
            });
        }

        if let Some(name) = doc.default_peer.as_ref() {
            if !names.contains(name) {
                return Err(PeersConfigError::UnknownPeer { name: name.clone() });
            }
        }

        let mut routes = HashMap::with_capacity(doc.routes.len());
        for route in doc.routes {
            if !names.contains(&route.peer) {
                return Err(PeersConfigError::UnknownPeer { name: route.peer });
            }
            routes.insert(route.user_id, route.peer);
        }

        Ok(PeersConfig {
            peers,
            routes,
            default_peer: doc.default_peer,
            relay_sources: doc.relay_sources,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- PeersConfig: Public ---------------------------------------------------

impl PeersConfig {
    /// Addresses whose connections may announce themselves as relay links:
    /// every peer listed by IP, plus `relay_sources`. Peers listed by host
    /// name must be added to `relay_sources` explicitly.
    pub fn trusted_relays(&self) -> HashSet<IpAddr> {
        self.peers
            .iter()
            .filter_map(|peer| peer.host.parse::<IpAddr>().ok())
            .chain(self.relay_sources.iter().copied())
            .collect()
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct GatewayFile {
    #[serde(default)]
    default_peer: Option<String>,
    #[serde(default)]
    peers: Vec<PeerFileEntry>,
    #[serde(default)]
    routes: Vec<RouteFileEntry>,
    #[serde(default)]
    relay_sources: Vec<IpAddr>,
}

#[derive(Debug, Clone, Deserialize)]
struct PeerFileEntry {
    name: String,
    host: String,
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct RouteFileEntry {
    user_id: u64,
    peer: String,
}

// -----------------------------------------------------------------------------
// ----- In-memory record ------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl PeerRecord {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PeersConfigError {
    #[error("duplicate [[peers]] entry for peer '{name}'")]
    DuplicatePeer { name: String },

    #[error("peer '{name}' is referenced but not declared in [[peers]]")]
    UnknownPeer { name: String },

    #[error("peer '{name}' has an empty host or a zero port")]
    BadAddress { name: String },

    #[error("read error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        default_peer = "gw-b"

        [[peers]]
        name = "gw-b"
        host = "10.0.0.2"
        port = 8085

        [[peers]]
        name = "gw-c"
        host = "10.0.0.3"
        port = 9000

        [[routes]]
        user_id = 42
        peer = "gw-c"
    "#;

    #[test]
    fn parses_peers_routes_and_default() {
        let cfg = PeersConfig::parse(SAMPLE).unwrap();
        assert_eq!(cfg.peers.len(), 2);
        assert_eq!(cfg.peers[1].addr(), "10.0.0.3:9000");
        assert_eq!(cfg.routes.get(&42).map(String::as_str), Some("gw-c"));
        assert_eq!(cfg.default_peer.as_deref(), Some("gw-b"));
    }

    #[test]
    fn empty_file_is_a_single_gateway() {
        let cfg = PeersConfig::parse("").unwrap();
        assert!(cfg.peers.is_empty());
        assert!(cfg.routes.is_empty());
        assert!(cfg.default_peer.is_none());
    }

    #[test]
    fn rejects_duplicate_peer() {
        let raw = r#"
            [[peers]]
            name = "a"
            host = "h"
            port = 1
            [[peers]]
            name = "a"
            host = "h2"
            port = 2
        "#;
        let err = PeersConfig::parse(raw).unwrap_err();
        assert!(matches!(err, PeersConfigError::DuplicatePeer { name } if name == "a"));
    }

    #[test]
    fn rejects_route_to_unknown_peer() {
        let raw = r#"
            [[routes]]
            user_id = 1
            peer = "ghost"
        "#;
        let err = PeersConfig::parse(raw).unwrap_err();
        assert!(matches!(err, PeersConfigError::UnknownPeer { name } if name == "ghost"));
    }

    #[test]
    fn rejects_unknown_default_peer() {
        let err = PeersConfig::parse(r#"default_peer = "nowhere""#).unwrap_err();
        assert!(matches!(err, PeersConfigError::UnknownPeer { .. }));
    }

    #[test]
    fn rejects_zero_port() {
        let raw = r#"
            [[peers]]
            name = "a"
            host = "h"
            port = 0
        "#;
        let err = PeersConfig::parse(raw).unwrap_err();
        assert!(matches!(err, PeersConfigError::BadAddress { .. }));
    }

    #[test]
    fn trusted_relays_cover_ip_peers_and_extra_sources() {
        let raw = r#"
            relay_sources = ["192.168.1.9"]

            [[peers]]
            name = "by-ip"
            host = "10.0.0.2"
            port = 8085

            [[peers]]
            name = "by-name"
            host = "gw-c.internal"
            port = 8085
        "#;
        let cfg = PeersConfig::parse(raw).unwrap();
        let trusted = cfg.trusted_relays();

        assert_eq!(trusted.len(), 2);
        assert!(trusted.contains(&"10.0.0.2".parse::<IpAddr>().unwrap()));
        assert!(trusted.contains(&"192.168.1.9".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn rejects_malformed_relay_source() {
        let err = PeersConfig::parse(r#"relay_sources = ["not-an-ip"]"#).unwrap_err();
        assert!(matches!(err, PeersConfigError::Toml { .. }));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let cfg = PeersConfig::from_file_async(file.path()).await.unwrap();
        assert_eq!(cfg.peers[0].name, "gw-b");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PeersConfig::from_file_async(&dir.path().join("nope.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, PeersConfigError::Io { .. }));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

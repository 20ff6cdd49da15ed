pub mod cli;
pub mod config;
pub mod peers;
pub mod types;

pub use config::Config;
pub use peers::{PeerRecord, PeersConfig, PeersConfigError};
pub use types::LogLevel;

pub mod config;
pub mod frontend;
pub mod gateway;
pub mod peer;
pub mod server;
pub mod shared_types;
pub mod wire;

pub use config::Config;
pub use frontend::ClientConnection;
pub use gateway::{Directory, PeerLinkPool, Router, SessionRegistry, StaticDirectory};
pub use server::{Gateway, GatewaySettings};
pub use wire::{Message, MessageType};

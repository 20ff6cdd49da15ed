//! Outbound links to other gateway instances.

pub mod link;

pub use link::{PeerLink, relay_hello};

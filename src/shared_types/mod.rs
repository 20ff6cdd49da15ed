pub mod auth_stage;
pub mod connection_id;

pub use auth_stage::AuthStage;
pub use connection_id::ConnectionId;

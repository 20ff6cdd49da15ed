pub mod assembler;
pub mod connection;
pub mod handle;

pub(crate) mod context;
pub(crate) mod handlers;
pub(crate) mod replies;

pub use assembler::FrameAssembler;
pub use connection::ClientConnection;
pub use handle::{ConnectionHandle, DeliveryError, WriterGuard};

//! Binary frame format shared by clients and peer gateways. Pure, no I/O.

pub mod error;
pub mod header;
pub mod message;
pub mod message_type;

pub use error::FrameError;
pub use header::{FrameHeader, HEADER_LEN};
pub use message::{Message, SERVER_USER_ID};
pub use message_type::MessageType;

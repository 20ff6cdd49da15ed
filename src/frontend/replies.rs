// Status frames the gateway itself sends to a client. They travel as ordinary
// frames from the server id (0) with a UTF-8 text payload.

use bytes::Bytes;

use crate::wire::{Message, MessageType, SERVER_USER_ID};

// -----------------------------------------------------------------------------
// ----- Handshake -------------------------------------------------------------

pub(crate) fn auth_ack(user_id: u64) -> Bytes {
    status(user_id, MessageType::Auth, format!("{user_id} authenticated"))
}

pub(crate) fn login_succeeded(user_id: u64) -> Bytes {
    status(user_id, MessageType::Auth, "login succeeded")
}

pub(crate) fn already_logged_in(user_id: u64) -> Bytes {
    status(user_id, MessageType::Auth, "already logged in")
}

pub(crate) fn auth_required() -> Bytes {
    status(SERVER_USER_ID, MessageType::Auth, "authentication required")
}

// -----------------------------------------------------------------------------
// ----- Delivery --------------------------------------------------------------

pub(crate) fn ok(to: u64) -> Bytes {
    status(to, MessageType::Text, "OK")
}

pub(crate) fn delivery_failed(to: u64, recipient: u64) -> Bytes {
    status(to, MessageType::Text, format!("delivery to {recipient} failed"))
}

pub(crate) fn unreachable(to: u64, recipient: u64) -> Bytes {
    status(to, MessageType::Text, format!("user {recipient} unreachable"))
}

// -----------------------------------------------------------------------------
// ----- Liveness --------------------------------------------------------------

pub(crate) fn pong(to: u64) -> Bytes {
    Message::new(SERVER_USER_ID, to, MessageType::Pong, Bytes::new()).encode()
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn status(to: u64, message_type: MessageType, text: impl Into<String>) -> Bytes {
    Message::new(SERVER_USER_ID, to, message_type, text.into().into_bytes()).encode()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

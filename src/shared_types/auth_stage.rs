/// Where a client connection stands in the handshake.
///
/// Every connection starts `Unauthenticated`. The first Auth frame with a
/// non-zero `fromUserID` moves it to `Authenticated`; an Auth frame carrying
/// the server id (0) instead marks the connection as a relay link opened by a
/// peer gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    /// Connected, no valid Auth frame seen yet.
    Unauthenticated,

    /// Bound to the user id carried by the first valid Auth frame.
    Authenticated { user_id: u64 },

    /// Inbound link from another gateway. Only carries forwarded traffic.
    Relay,
}

impl AuthStage {
    pub fn user_id(self) -> Option<u64> {
        match self {
            AuthStage::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }
}

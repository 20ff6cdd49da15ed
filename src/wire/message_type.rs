//! One-byte type tag carried at offset 16 of every frame.

// -----------------------------------------------------------------------------
// ----- MessageType -----------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MessageType {
    #[default]
    Auth,  // 0
    Text,  // 1
    Image, // 2
    Voice, // 3
    Video, // 4
    File,  // 5
    Ping,  // 6
    Pong,  // 7

    /// Any tag outside 0..=7. Kept verbatim so it survives a re-encode.
    Unknown(u8),
}

// -----------------------------------------------------------------------------
// ----- MessageType: Static ---------------------------------------------------

impl MessageType {
    pub fn from_byte(tag: u8) -> Self {
        match tag {
            0 => MessageType::Auth,
            1 => MessageType::Text,
            2 => MessageType::Image,
            3 => MessageType::Voice,
            4 => MessageType::Video,
            5 => MessageType::File,
            6 => MessageType::Ping,
            7 => MessageType::Pong,
            other => MessageType::Unknown(other),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- MessageType: Public ---------------------------------------------------

impl MessageType {
    pub fn as_byte(self) -> u8 {
        match self {
            MessageType::Auth => 0,
            MessageType::Text => 1,
            MessageType::Image => 2,
            MessageType::Voice => 3,
            MessageType::Video => 4,
            MessageType::File => 5,
            MessageType::Ping => 6,
            MessageType::Pong => 7,
            MessageType::Unknown(tag) => tag,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_map_both_ways() {
        for tag in 0u8..=7 {
            let ty = MessageType::from_byte(tag);
            assert!(!matches!(ty, MessageType::Unknown(_)));
            assert_eq!(ty.as_byte(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let ty = MessageType::from_byte(0xC8);
        assert_eq!(ty, MessageType::Unknown(0xC8));
        assert_eq!(ty.as_byte(), 0xC8);
    }

    #[test]
    fn defaults_to_auth() {
        assert_eq!(MessageType::default(), MessageType::Auth);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

use std::io::ErrorKind;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::wire::{Message, MessageType, SERVER_USER_ID};

// -----------------------------------------------------------------------------
// ----- PeerLink --------------------------------------------------------------

/// Outbound connection to another gateway. Write-only: the far side treats it
/// as a relay and never answers.
#[derive(Debug)]
pub struct PeerLink {
    stream: TcpStream,
}

impl PeerLink {
    /// Dial `addr` and announce this side as a relay.
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let mut link = Self { stream };
        link.send(&relay_hello()).await?;

        Ok(link)
    }

    /// Write one frame and flush it.
    pub async fn send(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }

    /// True once the far side has closed or reset the connection. The far
    /// side never writes on a relay link, so a stray byte is discarded.
    pub fn is_closed(&self) -> bool {
        let mut byte = [0u8; 1];
        match self.stream.try_read(&mut byte) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(_) => true,
        }
    }
}

/// Auth frame from the server id: tells the receiving gateway that this
/// connection carries forwarded traffic rather than a user.
pub fn relay_hello() -> bytes::Bytes {
    Message::new(
        SERVER_USER_ID,
        SERVER_USER_ID,
        MessageType::Auth,
        bytes::Bytes::new(),
    )
    .encode()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

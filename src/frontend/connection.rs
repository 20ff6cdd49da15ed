use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpStream, tcp::OwnedReadHalf};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::frontend::assembler::FrameAssembler;
use crate::frontend::context::ConnectionContext;
use crate::frontend::handle::{ConnectionHandle, WriterGuard};
use crate::frontend::handlers;
use crate::server::Gateway;
use crate::shared_types::ConnectionId;

// -----------------------------------------------------------------------------
// ----- ClientConnection ------------------------------------------------------

/// One accepted TCP connection, from the first byte to teardown.
///
/// Frames are processed strictly in arrival order: each one is reassembled,
/// decoded and fully handled before the next is looked at.
#[derive(Debug)]
pub struct ClientConnection {
    // Field order is drop order: release sessions before stopping the writer.
    context: ConnectionContext,
    _writer: WriterGuard,

    assembler: FrameAssembler,
    reader: OwnedReadHalf,
    gateway: Arc<Gateway>,
}

// -----------------------------------------------------------------------------
// ----- ClientConnection: Static ----------------------------------------------

impl ClientConnection {
    pub fn new(stream: TcpStream, remote_addr: SocketAddr, gateway: Arc<Gateway>) -> Self {
        let (reader, writer) = stream.into_split();

        let id = ConnectionId::next();
        let (handle, writer_guard) =
            ConnectionHandle::spawn_writer(id, remote_addr.to_string(), writer);

        Self {
            context: ConnectionContext::new(handle, remote_addr.ip().to_canonical()),
            _writer: writer_guard,
            assembler: FrameAssembler::new(gateway.settings().max_payload_len),
            reader,
            gateway,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ClientConnection: Public ----------------------------------------------

impl ClientConnection {
    pub fn id(&self) -> ConnectionId {
        self.context.connection.id()
    }

    pub async fn serve(mut self) -> std::io::Result<()> {
        info!("connection {} opened from {}", self.id(), self.context.remote_addr());

        let result = self.serve_frames().await;

        let released: Vec<u64> = self.context.held_user_ids().collect();
        info!(
            "connection {} from {} closed; releasing sessions {:?}",
            self.id(),
            self.context.remote_addr(),
            released
        );

        result
    }
}

// -----------------------------------------------------------------------------
// ----- ClientConnection: Private ---------------------------------------------

impl ClientConnection {
    async fn serve_frames(&mut self) -> std::io::Result<()> {
        loop {
            let Some(n) = self.read_more().await? else {
                info!(
                    "connection {} idle for too long; closing",
                    self.context.remote_addr()
                );
                return Ok(());
            };

            if n == 0 {
                return Ok(());
            }

            self.drain_ready_frames().await?;
        }
    }

    /// `None` when the idle timeout fired before any byte arrived. Relay links
    /// are exempt: a quiet peer gateway is not an idle client.
    async fn read_more(&mut self) -> std::io::Result<Option<usize>> {
        let limit = match self.context.is_relay() {
            true => None,
            false => self.gateway.settings().idle_timeout,
        };

        let read = self.assembler.read_from(&mut self.reader);

        match limit {
            Some(limit) => match timeout(limit, read).await {
                Ok(res) => res.map(Some),
                Err(_) => Ok(None),
            },
            None => read.await.map(Some),
        }
    }

    /// Handle every complete frame currently buffered before reading again.
    async fn drain_ready_frames(&mut self) -> std::io::Result<()> {
        loop {
            let message = match self.assembler.next_message() {
                Ok(Some(message)) => message,
                Ok(None) => return Ok(()),
                Err(err) => {
                    warn!(
                        "closing {}: malformed frame: {err}",
                        self.context.remote_addr()
                    );
                    return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, err));
                }
            };

            debug!(
                "frame {:?} {} -> {} ({} bytes) on connection {}",
                message.message_type,
                message.from_user_id,
                message.to_user_id,
                message.payload.len(),
                self.id()
            );

            handlers::dispatch(&mut self.context, &self.gateway, message).await?;
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

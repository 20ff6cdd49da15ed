use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    select,
    sync::{mpsc, oneshot},
};
use tracing::debug;

use crate::shared_types::ConnectionId;

// -----------------------------------------------------------------------------
// ----- ConnectionHandle ------------------------------------------------------

/// Cloneable write side of a client connection.
///
/// The socket itself belongs to a dedicated writer task; handles only queue
/// frames for it. Each `send` waits for its frame to be written and flushed,
/// so callers learn about failures of that exact write. Holding a handle does
/// not keep the connection open: that is the job of the `WriterGuard` owned by
/// the connection task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    remote_addr: Arc<str>,
    tx: mpsc::UnboundedSender<Outbound>,
}

/// One queued frame plus the channel its write result goes back on.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub(crate) frame: Bytes,
    pub(crate) ack: oneshot::Sender<std::io::Result<()>>,
}

/// Stops the writer task when dropped.
#[derive(Debug)]
pub struct WriterGuard {
    _stop: oneshot::Sender<()>,
}

// -----------------------------------------------------------------------------
// ----- ConnectionHandle: Static ----------------------------------------------

impl ConnectionHandle {
    /// Move `writer` into its own task and return a handle to it.
    pub fn spawn_writer<W>(
        id: ConnectionId,
        remote_addr: impl Into<Arc<str>>,
        writer: W,
    ) -> (Self, WriterGuard)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (handle, rx) = Self::channel(id, remote_addr);
        let (stop_tx, stop_rx) = oneshot::channel();

        spawn_writer_task(id, writer, rx, stop_rx);

        (handle, WriterGuard { _stop: stop_tx })
    }

    /// A handle with no writer task behind it; the receiver stands in for one.
    pub(crate) fn channel(
        id: ConnectionId,
        remote_addr: impl Into<Arc<str>>,
    ) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id,
            remote_addr: remote_addr.into(),
            tx,
        };

        (handle, rx)
    }
}

// -----------------------------------------------------------------------------
// ----- ConnectionHandle: Public ----------------------------------------------

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// Write one encoded frame and flush it. No batching, no retry.
    pub async fn send(&self, frame: Bytes) -> Result<(), DeliveryError> {
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send(Outbound { frame, ack: ack_tx })
            .map_err(|_| DeliveryError::ConnectionClosed { id: self.id })?;

        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(DeliveryError::Write {
                id: self.id,
                source,
            }),
            Err(_) => Err(DeliveryError::ConnectionClosed { id: self.id }),
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("connection {id} is closed")]
    ConnectionClosed { id: ConnectionId },

    #[error("write to connection {id} failed: {source}")]
    Write {
        id: ConnectionId,
        source: std::io::Error,
    },
}

impl From<DeliveryError> for std::io::Error {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::ConnectionClosed { .. } => {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, err.to_string())
            }
            DeliveryError::Write { source, .. } => source,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn spawn_writer_task<W>(
    id: ConnectionId,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mut stop: oneshot::Receiver<()>,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let outbound = select! {
                _ = &mut stop => break,
                next = rx.recv() => match next {
                    Some(outbound) => outbound,
                    None => break,
                },
            };

            let result = write_and_flush(&mut writer, &outbound.frame).await;
            let failed = result.is_err();
            let _ = outbound.ack.send(result);

            if failed {
                break;
            }
        }

        // Fail anything still queued instead of leaving senders hanging.
        rx.close();
        while let Ok(outbound) = rx.try_recv() {
            let _ = outbound.ack.send(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "connection closed",
            )));
        }

        let _ = writer.shutdown().await;
        debug!("writer for connection {id} stopped");
    });
}

async fn write_and_flush<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn send_reaches_the_socket() {
        let (client, mut server) = tokio::io::duplex(64);
        let (handle, _guard) = ConnectionHandle::spawn_writer(ConnectionId::next(), "test", client);

        handle.send(Bytes::from_static(b"ping")).await.unwrap();

        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn send_fails_after_guard_dropped() {
        let (client, _server) = tokio::io::duplex(64);
        let (handle, guard) = ConnectionHandle::spawn_writer(ConnectionId::next(), "test", client);

        drop(guard);

        let mut closed = false;
        for _ in 0..50 {
            if handle.is_closed() {
                closed = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(closed);

        let err = handle.send(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, DeliveryError::ConnectionClosed { .. }));
    }

    #[tokio::test]
    async fn write_error_is_reported_to_the_sender() {
        let (client, server) = tokio::io::duplex(64);
        let (handle, _guard) = ConnectionHandle::spawn_writer(ConnectionId::next(), "test", client);

        drop(server);

        let err = handle.send(Bytes::from_static(b"lost")).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Write { .. }));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------

use std::{
    collections::HashSet,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use imgate::config::PeerRecord;
use imgate::wire::HEADER_LEN;
use imgate::{Directory, Gateway, GatewaySettings, Message, MessageType, StaticDirectory};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{mpsc, oneshot},
    time::{sleep, timeout},
};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

// -----------------------------------------------------------------------------
// ----- In-process gateway ----------------------------------------------------

pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[allow(dead_code)]
pub async fn start_standalone() -> TestGateway {
    start(Gateway::standalone(GatewaySettings::default())).await
}

#[allow(dead_code)]
pub async fn start_with_peer(peer: &str, peer_addr: SocketAddr) -> TestGateway {
    let record = PeerRecord {
        name: peer.to_string(),
        host: peer_addr.ip().to_string(),
        port: peer_addr.port(),
    };
    let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::single(peer));

    // A configured peer may also dial in, as it would in production.
    let settings = GatewaySettings {
        trusted_relays: HashSet::from([peer_addr.ip()]),
        ..GatewaySettings::default()
    };

    start(Gateway::new(settings, vec![record], directory)).await
}

/// Settings for a gateway that accepts relay links from other in-process
/// gateways.
#[allow(dead_code)]
pub fn trusting_loopback() -> GatewaySettings {
    GatewaySettings {
        trusted_relays: HashSet::from([IpAddr::V4(Ipv4Addr::LOCALHOST)]),
        ..GatewaySettings::default()
    }
}

#[allow(dead_code)]
pub async fn start_with_settings(settings: GatewaySettings) -> TestGateway {
    start(Gateway::standalone(settings)).await
}

pub async fn start(gateway: Gateway) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind gateway");
    let addr = listener.local_addr().unwrap();
    let gateway = Arc::new(gateway);

    let (tx, rx) = oneshot::channel::<()>();
    let serving = gateway.clone();
    tokio::spawn(async move {
        let _ = serving
            .serve(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    TestGateway {
        addr,
        gateway,
        shutdown: Some(tx),
    }
}

// -----------------------------------------------------------------------------
// ----- Test client -----------------------------------------------------------

pub struct TestClient {
    pub stream: TcpStream,
}

#[allow(dead_code)]
impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to gateway");
        stream.set_nodelay(true).unwrap();
        Self { stream }
    }

    /// Connect and log in as `user_id`, consuming both handshake replies.
    pub async fn login(addr: SocketAddr, user_id: u64) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(&auth(user_id)).await;

        let ack = client.recv().await;
        assert_eq!(ack.payload_text(), format!("{user_id} authenticated"));
        let login = client.recv().await;
        assert_eq!(login.payload_text(), "login succeeded");

        client
    }

    pub async fn send(&mut self, message: &Message) {
        self.send_raw(&message.encode()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("client write");
        self.stream.flush().await.expect("client flush");
    }

    pub async fn recv(&mut self) -> Message {
        timeout(IO_TIMEOUT, read_message(&mut self.stream))
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed while waiting for a frame")
    }

    /// True when nothing arrives within `wait`.
    pub async fn is_silent_for(&mut self, wait: Duration) -> bool {
        let mut byte = [0u8; 1];
        timeout(wait, self.stream.peek(&mut byte)).await.is_err()
    }

    /// True when the gateway closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 256];
        loop {
            match timeout(IO_TIMEOUT, self.stream.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Capture peer ----------------------------------------------------------

/// Stand-in for a remote gateway: records every frame sent to it.
pub struct CapturePeer {
    pub addr: SocketAddr,
    frames: mpsc::UnboundedReceiver<Message>,
}

#[allow(dead_code)]
impl CapturePeer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind peer");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    while let Some(msg) = read_message(&mut stream).await {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self { addr, frames: rx }
    }

    pub async fn next(&mut self) -> Message {
        timeout(IO_TIMEOUT, self.frames.recv())
            .await
            .expect("timed out waiting for a forwarded frame")
            .expect("capture peer stopped")
    }

    pub async fn is_silent_for(&mut self, wait: Duration) -> bool {
        timeout(wait, self.frames.recv()).await.is_err()
    }
}

// -----------------------------------------------------------------------------
// ----- Helpers ---------------------------------------------------------------

pub trait PayloadText {
    fn payload_text(&self) -> String;
}

impl PayloadText for Message {
    fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

pub fn auth(user_id: u64) -> Message {
    Message::new(user_id, 0, MessageType::Auth, bytes_of(""))
}

#[allow(dead_code)]
pub fn text(from: u64, to: u64, body: &str) -> Message {
    Message::new(from, to, MessageType::Text, bytes_of(body))
}

#[allow(dead_code)]
pub fn ping(from: u64) -> Message {
    Message::new(from, 0, MessageType::Ping, bytes_of(""))
}

fn bytes_of(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

#[allow(dead_code)]
pub async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

async fn read_message(stream: &mut TcpStream) -> Option<Message> {
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await.ok()?;

    let len = u32::from_be_bytes([header[17], header[18], header[19], header[20]]) as usize;
    let mut frame = header.to_vec();
    frame.resize(HEADER_LEN + len, 0);
    stream.read_exact(&mut frame[HEADER_LEN..]).await.ok()?;

    Message::decode(&frame).ok()
}

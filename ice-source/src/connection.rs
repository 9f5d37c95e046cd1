//! Outbound TCP connection to the server: one socket, one background receive
//! task, lifecycle and data events delivered over a channel.
//!
//! Any teardown (caller, receive task or a [`DisconnectHandle`]) drops the
//! write half, and the receive task drops the read half when it exits, so
//! the socket closes no matter which context started it.
//!
//! A readable socket whose only pending byte is `0x00` is treated as a
//! hang-up, even if that byte was real data. The server sends nothing after
//! its handshake response, so no payload is lost.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Upper bound on one idle wait in the receive task.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_BUF_SIZE: usize = 64 * 1024;

/// Notifications raised by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    /// Exactly one read's worth of bytes. A read is capped at 64 KiB, so a
    /// larger backlog arrives as several events.
    Data(Vec<u8>),
    /// Sent once per connection; nothing follows it.
    Disconnected,
}

struct Link {
    connected: bool,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

/// State shared by the owner, the receive task and any [`DisconnectHandle`].
/// Events are only sent while holding the link lock, so a `Data` event can
/// never follow `Disconnected`.
struct Shared {
    link: Mutex<Link>,
    /// Only `send` holds this across an await.
    writer: AsyncMutex<Option<OwnedWriteHalf>>,
}

fn lock(link: &Mutex<Link>) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(|e| e.into_inner())
}

impl Shared {
    fn is_connected(&self) -> bool {
        lock(&self.link).connected
    }

    fn mark_connected(&self) {
        let mut link = lock(&self.link);
        link.connected = true;
        let _ = link.events.send(ConnectionEvent::Connected);
    }

    fn emit_data(&self, data: Vec<u8>) -> bool {
        let link = lock(&self.link);
        if !link.connected {
            return false;
        }
        let _ = link.events.send(ConnectionEvent::Data(data));
        true
    }

    /// Clear the connected flag, close the write half and notify. Only the
    /// first caller notifies; returns whether this call was it.
    fn teardown(&self) -> bool {
        let first = {
            let mut link = lock(&self.link);
            let first = link.connected;
            if first {
                link.connected = false;
                let _ = link.events.send(ConnectionEvent::Disconnected);
            }
            first
        };
        self.drop_writer();
        first
    }

    /// Close the write half unless a send holds it; that send drops it
    /// itself once it sees the flag cleared.
    fn drop_writer(&self) {
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }
}

/// Cloneable handle that can tear a connection down from another task.
#[derive(Clone)]
pub struct DisconnectHandle {
    shared: Arc<Shared>,
}

impl DisconnectHandle {
    pub fn disconnect(&self) {
        if self.shared.teardown() {
            tracing::info!("connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }
}

/// A single outbound TCP connection. Not reusable: after a disconnect, make a
/// new one.
pub struct Connection {
    host: String,
    port: u16,
    shared: Arc<Shared>,
    reader_task: Option<JoinHandle<()>>,
    used: bool,
}

impl Connection {
    /// Create an unconnected connection and the receiver for its events.
    pub fn new(
        host: impl Into<String>,
        port: u16,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            link: Mutex::new(Link {
                connected: false,
                events: tx,
            }),
            writer: AsyncMutex::new(None),
        });
        let conn = Self {
            host: host.into(),
            port,
            shared,
            reader_task: None,
            used: false,
        };
        (conn, rx)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn handle(&self) -> DisconnectHandle {
        DisconnectHandle {
            shared: self.shared.clone(),
        }
    }

    /// Open the socket and start the receive task. On failure nothing is left
    /// running and no event is raised.
    pub async fn connect(&mut self) -> bool {
        if self.used {
            tracing::warn!(host = %self.host, port = self.port, "connection already used");
            return false;
        }
        self.used = true;
        let addr = (self.host.as_str(), self.port);
        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                tracing::warn!(host = %self.host, port = self.port, error = %e, "connect failed");
                return false;
            }
            Err(_) => {
                tracing::warn!(host = %self.host, port = self.port, "connect timed out");
                return false;
            }
        };
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        *self.shared.writer.lock().await = Some(writer);
        self.shared.mark_connected();
        self.reader_task = Some(tokio::spawn(receive_loop(reader, self.shared.clone())));
        tracing::info!(host = %self.host, port = self.port, "connected");
        true
    }

    /// Write the whole buffer. No-op when not connected; write errors are
    /// returned to the caller.
    pub async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        let result = {
            let mut guard = self.shared.writer.lock().await;
            let Some(writer) = guard.as_mut() else {
                return Ok(());
            };
            match writer.write_all(data).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        // A teardown that ran while the writer was held could not close it.
        if !self.shared.is_connected() {
            self.shared.drop_writer();
        }
        result
    }

    /// Close the socket and stop the receive task. Safe to repeat; the
    /// `Disconnected` event fires once.
    pub fn disconnect(&mut self) {
        if self.shared.teardown() {
            tracing::info!(host = %self.host, port = self.port, "disconnected");
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Sole reader of the socket. Each wait is bounded by [`POLL_INTERVAL`] so a
/// teardown from elsewhere is noticed promptly.
async fn receive_loop(mut reader: OwnedReadHalf, shared: Arc<Shared>) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    while shared.is_connected() {
        let available = match tokio::time::timeout(POLL_INTERVAL, reader.peek(&mut buf)).await {
            Err(_) => continue,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "receive failed");
                break;
            }
        };
        // Readable but empty, or a lone null byte: the server hung up.
        if available == 0 || (available == 1 && buf[0] == 0) {
            tracing::info!("server closed the connection");
            break;
        }
        if let Err(e) = reader.read_exact(&mut buf[..available]).await {
            tracing::warn!(error = %e, "receive failed");
            break;
        }
        if !shared.emit_data(buf[..available].to_vec()) {
            return;
        }
    }
    shared.teardown();
}

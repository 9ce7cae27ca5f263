use crate::{BusConfig, ComError, Role};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

/// Inbound lines larger than this are rejected. The limit is enforced while
/// the line is being read, so a peer cannot grow memory past it.
pub const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

type PeerMap = Arc<RwLock<HashMap<SocketAddr, OwnedWriteHalf>>>;

/// Pub/sub endpoint over TCP with JSON-lines framing.
///
/// A publisher `send`s, a subscriber `recv`s; either side may bind the
/// listening address while the other connects. A bound publisher broadcasts
/// to every connected subscriber and prunes peers that fail. A bound
/// subscriber accepts any number of publishers and merges their streams.
pub struct MessageBus<T> {
    inner: Option<Inner>,
    role: Role,
    filter: String,
    _marker: PhantomData<T>,
}

enum Inner {
    BoundPublisher {
        peers: PeerMap,
        accept_task: JoinHandle<()>,
        local_addr: SocketAddr,
    },
    ConnectedPublisher {
        writer: OwnedWriteHalf,
    },
    BoundSubscriber {
        lines: mpsc::UnboundedReceiver<String>,
        accept_task: JoinHandle<()>,
        local_addr: SocketAddr,
    },
    ConnectedSubscriber {
        reader: BufReader<OwnedReadHalf>,
    },
}

impl<T: Serialize + DeserializeOwned> MessageBus<T> {
    /// Open a bus endpoint according to `config`.
    ///
    /// Binding opens a TCP listener and spawns an accept task; connecting
    /// dials the endpoint once. Errors surface immediately, before the caller
    /// enters its run loop.
    pub async fn open(config: BusConfig) -> Result<Self, ComError> {
        let addr = config.tcp_addr()?.to_string();
        let role = config.role();

        let inner = match (role, config.bind()) {
            (Role::Publish, true) => {
                let listener = TcpListener::bind(addr.as_str()).await?;
                let local_addr = listener.local_addr()?;

                let peers: PeerMap = Arc::new(RwLock::new(HashMap::new()));
                let peers_clone = Arc::clone(&peers);

                // Accept loop collects subscriber write halves.
                let accept_task = tokio::spawn(async move {
                    loop {
                        match listener.accept().await {
                            Ok((stream, addr)) => {
                                let (_, write_half) = stream.into_split();
                                peers_clone.write().await.insert(addr, write_half);
                            }
                            Err(e) => {
                                log::warn!("accept error: {}", e);
                                // Backoff to prevent CPU spin on persistent errors
                                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                            }
                        }
                    }
                });

                Inner::BoundPublisher {
                    peers,
                    accept_task,
                    local_addr,
                }
            }
            (Role::Publish, false) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                let (_, writer) = stream.into_split();
                Inner::ConnectedPublisher { writer }
            }
            (Role::Subscribe, true) => {
                let listener = TcpListener::bind(addr.as_str()).await?;
                let local_addr = listener.local_addr()?;

                let (tx, lines) = mpsc::unbounded_channel();

                // One reader task per accepted publisher, all funneling into
                // the same channel. Readers exit when their stream closes or
                // when the bus drops the receiving end.
                let accept_task = tokio::spawn(async move {
                    loop {
                        match listener.accept().await {
                            Ok((stream, addr)) => {
                                let tx = tx.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = pump_lines(stream, tx).await {
                                        log::warn!("read error from {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                log::warn!("accept error: {}", e);
                                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                            }
                        }
                    }
                });

                Inner::BoundSubscriber {
                    lines,
                    accept_task,
                    local_addr,
                }
            }
            (Role::Subscribe, false) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                let (read_half, _) = stream.into_split();
                Inner::ConnectedSubscriber {
                    reader: BufReader::new(read_half),
                }
            }
        };

        Ok(Self {
            inner: Some(inner),
            role,
            filter: config.subscribe().to_string(),
            _marker: PhantomData,
        })
    }

    /// Serialize a message as one JSON line and transmit it.
    ///
    /// A bound publisher broadcasts to all connected peers; peers that fail
    /// are pruned and logged. A connected publisher surfaces the write error
    /// to the caller. No retry, no delivery guarantee.
    pub async fn send(&mut self, value: &T) -> Result<(), ComError> {
        let inner = self.inner.as_mut().ok_or(ComError::Closed)?;

        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        match inner {
            Inner::BoundPublisher { peers, .. } => {
                let mut lock = peers.write().await;

                let mut failed_addrs = Vec::new();
                for (addr, writer) in lock.iter_mut() {
                    if let Err(e) = writer.write_all(&line).await {
                        log::warn!("failed to send to {}: {}", addr, e);
                        failed_addrs.push(*addr);
                    }
                }

                for addr in failed_addrs {
                    lock.remove(&addr);
                }

                Ok(())
            }
            Inner::ConnectedPublisher { writer } => {
                writer.write_all(&line).await?;
                Ok(())
            }
            _ => Err(ComError::RoleMismatch("send requires the publish role")),
        }
    }

    /// Block until the next message that passes the subscription filter.
    ///
    /// Returns `ComError::ConnectionClosed` when the peer side closes and no
    /// further messages can arrive.
    pub async fn recv(&mut self) -> Result<T, ComError> {
        loop {
            let line = {
                let inner = self.inner.as_mut().ok_or(ComError::Closed)?;
                match inner {
                    Inner::BoundSubscriber { lines, .. } => {
                        lines.recv().await.ok_or(ComError::ConnectionClosed)?
                    }
                    Inner::ConnectedSubscriber { reader } => {
                        match read_line_capped(reader).await? {
                            Some(line) => line,
                            None => return Err(ComError::ConnectionClosed),
                        }
                    }
                    _ => return Err(ComError::RoleMismatch("recv requires the subscribe role")),
                }
            };

            // ZMQ-style prefix filter on the raw payload; empty matches all.
            if !self.filter.is_empty() && !line.starts_with(&self.filter) {
                continue;
            }

            return serde_json::from_str(&line).map_err(ComError::from);
        }
    }

    /// Release the underlying connection.
    ///
    /// Idempotent, and safe to call regardless of how far construction or the
    /// run loop got. Subsequent `send`/`recv` calls return `ComError::Closed`.
    pub async fn close(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        match inner {
            Inner::BoundPublisher {
                peers, accept_task, ..
            } => {
                accept_task.abort();
                let mut lock = peers.write().await;
                for (_, mut writer) in lock.drain() {
                    let _ = writer.shutdown().await;
                }
            }
            Inner::ConnectedPublisher { mut writer } => {
                let _ = writer.shutdown().await;
            }
            Inner::BoundSubscriber { accept_task, .. } => {
                // Dropping the line channel stops the reader tasks.
                accept_task.abort();
            }
            Inner::ConnectedSubscriber { .. } => {}
        }

        log::debug!("message bus closed");
    }

    /// Local address when bound; `None` for connected endpoints.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            Some(Inner::BoundPublisher { local_addr, .. })
            | Some(Inner::BoundSubscriber { local_addr, .. }) => Some(*local_addr),
            _ => None,
        }
    }

    /// Number of connected subscribers (bound publisher only).
    pub async fn peer_count(&self) -> usize {
        match &self.inner {
            Some(Inner::BoundPublisher { peers, .. }) => peers.read().await.len(),
            _ => 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether `close` has released the connection.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T> Drop for MessageBus<T> {
    fn drop(&mut self) {
        match &self.inner {
            Some(Inner::BoundPublisher { accept_task, .. })
            | Some(Inner::BoundSubscriber { accept_task, .. }) => accept_task.abort(),
            _ => {}
        }
    }
}

/// Forward newline-delimited lines from a stream into the merge channel.
async fn pump_lines(stream: TcpStream, tx: mpsc::UnboundedSender<String>) -> Result<(), ComError> {
    let mut reader = BufReader::new(stream);
    loop {
        let Some(line) = read_line_capped(&mut reader).await? else {
            return Ok(());
        };
        if tx.send(line).is_err() {
            // Bus closed, stop reading.
            return Ok(());
        }
    }
}

/// Read one newline-delimited line, enforcing `MAX_MESSAGE_LEN` while the
/// bytes are buffered. `Ok(None)` means the stream ended cleanly.
async fn read_line_capped<R>(reader: &mut R) -> Result<Option<String>, ComError>
where
    R: AsyncBufRead + Unpin,
{
    // Allow the payload plus a trailing "\r\n" before cutting the read off.
    let mut limited = reader.take(MAX_MESSAGE_LEN as u64 + 2);
    let mut buf = Vec::new();
    if limited.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(&(b'\n' | b'\r'))) {
        buf.pop();
    }
    if buf.len() > MAX_MESSAGE_LEN {
        return Err(ComError::MessageTooLarge(buf.len()));
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| ComError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

//! TCP connection management — single-client listener and dialer.
//!
//! The traffic is a continuous real-time stream, so both sides enable
//! `TCP_NODELAY` (batching delay hurts interactivity far more than it
//! helps throughput) and the dialer turns on keep-alive probing.
//!
//! One session means one stream: the listener hands out exactly one
//! [`Connection`] and closes its socket, so a second connect attempt
//! is refused by the OS instead of displacing the active client.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream, lookup_host};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::codec::FrameCodec;
use crate::error::LinkError;

/// A framed read half: frames in, bytes out of the socket.
pub type FrameStream = FramedRead<TcpStream, FrameCodec>;

/// A framed write half: frames out, flushed whole.
pub type FrameSink = FramedWrite<TcpStream, FrameCodec>;

// ── ConnectionInfo ───────────────────────────────────────────────

/// Remote endpoint coordinates supplied by the caller.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Listener ─────────────────────────────────────────────────────

/// Accept-one-client listener for the source side.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind on all interfaces at `port`. Port 0 asks the OS for an
    /// ephemeral port (useful in tests).
    pub async fn bind(port: u16) -> Result<Self, LinkError> {
        let inner = TcpListener::bind(("0.0.0.0", port)).await?;
        info!("listening on {}", inner.local_addr()?);
        Ok(Self { inner })
    }

    /// The locally bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.inner.local_addr()?)
    }

    /// Accept exactly one client, then close the listening socket.
    ///
    /// Consuming `self` is what enforces the single-client model:
    /// once the first client is in, later connect attempts are
    /// refused and the active stream is never displaced.
    pub async fn accept(self) -> Result<Connection, LinkError> {
        let (stream, peer) = self.inner.accept().await?;
        stream.set_nodelay(true)?;
        info!("client connected from {peer}");
        Ok(Connection { stream, peer })
    }
}

// ── Connection ───────────────────────────────────────────────────

/// A single ordered, reliable byte-stream endpoint.
///
/// Owns exactly one underlying stream; created by one dial or one
/// accept, destroyed on drop.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    /// Dial `info` with a bounded connect timeout.
    ///
    /// On failure the error is returned to the caller without retry;
    /// retry policy, if any, belongs to the caller.
    pub async fn dial(info: &ConnectionInfo, timeout: Duration) -> Result<Self, LinkError> {
        debug!("connecting to {info}...");

        let addr = lookup_host((info.host(), info.port()))
            .await?
            .next()
            .ok_or(LinkError::Protocol("host resolved to no addresses"))?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_keepalive(true)?;

        let stream = tokio::time::timeout(timeout, socket.connect(addr))
            .await
            .map_err(|_| LinkError::ConnectTimeout(timeout))??;
        stream.set_nodelay(true)?;

        info!("connected to {addr}");
        Ok(Self { stream, peer: addr })
    }

    /// The remote endpoint of this connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Turn this connection into a frame reader enforcing
    /// `max_frame_size`.
    pub fn into_frame_stream(self, max_frame_size: usize) -> FrameStream {
        FramedRead::new(self.stream, FrameCodec::new(max_frame_size))
    }

    /// Turn this connection into a frame writer enforcing
    /// `max_frame_size`.
    pub fn into_frame_sink(self, max_frame_size: usize) -> FrameSink {
        FramedWrite::new(self.stream, FrameCodec::new(max_frame_size))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};

    use crate::frame::{Frame, FrameFlags, MAX_FRAME_SIZE};

    #[tokio::test]
    async fn dial_and_accept_frame_transfer() {
        let listener = Listener::bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let dialer = tokio::spawn(async move {
            let info = ConnectionInfo::new("127.0.0.1", port);
            Connection::dial(&info, Duration::from_secs(5)).await.unwrap()
        });

        let server_conn = listener.accept().await.unwrap();
        let client_conn = dialer.await.unwrap();

        let mut sink = server_conn.into_frame_sink(MAX_FRAME_SIZE);
        let mut stream = client_conn.into_frame_stream(MAX_FRAME_SIZE);

        let frame = Frame::new(7, FrameFlags::empty(), vec![0x42u8; 64]);
        sink.send(frame.clone()).await.unwrap();

        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn dial_refused_surfaces_connection_error() {
        // Bind and immediately drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let info = ConnectionInfo::new("127.0.0.1", port);
        let result = Connection::dial(&info, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(LinkError::Connection(_))));
    }

    #[tokio::test]
    async fn second_client_is_refused() {
        let listener = Listener::bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let info = ConnectionInfo::new("127.0.0.1", port);

        let dialer = tokio::spawn({
            let info = info.clone();
            async move { Connection::dial(&info, Duration::from_secs(5)).await.unwrap() }
        });
        let first_server = listener.accept().await.unwrap();
        let first_client = dialer.await.unwrap();

        // The listening socket is gone; a new dial must not succeed
        // as a usable stream. It either fails outright or is reset
        // before any data arrives.
        let second = Connection::dial(&info, Duration::from_secs(2)).await;
        if let Ok(conn) = second {
            let mut stream = conn.into_frame_stream(MAX_FRAME_SIZE);
            assert!(!matches!(stream.next().await, Some(Ok(_))));
        }

        // The first client's stream is unaffected.
        let mut sink = first_server.into_frame_sink(MAX_FRAME_SIZE);
        let mut stream = first_client.into_frame_stream(MAX_FRAME_SIZE);
        let frame = Frame::new(1, FrameFlags::empty(), vec![1u8; 16]);
        sink.send(frame.clone()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), frame);
    }

    #[test]
    fn connection_info_display() {
        let info = ConnectionInfo::new("192.168.1.50", 5555);
        assert_eq!(info.to_string(), "192.168.1.50:5555");
    }
}

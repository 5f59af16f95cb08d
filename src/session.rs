//! Session lifecycle controller — start sequencing and idempotent
//! teardown for one pump, its connection, and its codec capability.
//!
//! Start order: the codec capability is brought up first (the caller
//! passes it in already usable), then the connection is established,
//! then the pump task is spawned — each prerequisite ready before the
//! next is attempted.
//!
//! Stop sets the cooperative cancellation token; every pump blocking
//! point selects against it, so a pump stuck in a socket read or a
//! codec wait unblocks within one iteration, after which it drops its
//! connection half and closes the codec session. [`stop`] is
//! synchronous, idempotent, and safe to call concurrently or before
//! the pump has begun running. [`join`] returns the single terminal
//! status.
//!
//! [`stop`]: StreamSession::stop
//! [`join`]: StreamSession::join

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::StreamConfig;
use crate::connection::{Connection, ConnectionInfo, Listener};
use crate::error::LinkError;
use crate::media::MediaSession;
use crate::pump::{DecodePump, EncodePump, PumpState, PumpStats};

/// A running one-directional streaming session (either side).
pub struct StreamSession {
    cancel: CancellationToken,
    handle: Option<JoinHandle<Result<(), LinkError>>>,
    state_rx: watch::Receiver<PumpState>,
    stats_rx: watch::Receiver<PumpStats>,
    peer: SocketAddr,
}

impl StreamSession {
    /// Source side: wait for the single sink client on `port`, then
    /// pump the already-producing `encoder` session onto the wire.
    pub async fn serve(
        config: &StreamConfig,
        encoder: Box<dyn MediaSession>,
        port: u16,
    ) -> Result<Self, LinkError> {
        let listener = Listener::bind(port).await?;
        Self::serve_on(config, encoder, listener).await
    }

    /// Like [`serve`](Self::serve), with a pre-bound listener (lets
    /// callers bind port 0 and read the assigned port first).
    pub async fn serve_on(
        config: &StreamConfig,
        encoder: Box<dyn MediaSession>,
        listener: Listener,
    ) -> Result<Self, LinkError> {
        let conn = listener.accept().await?;
        let peer = conn.peer_addr();
        info!("encode session started for {peer}");

        let cancel = CancellationToken::new();
        let pump = EncodePump::new(
            encoder,
            conn.into_frame_sink(config.max_frame_size),
            cancel.clone(),
        );
        let state_rx = pump.state_receiver();
        let stats_rx = pump.stats_receiver();

        Ok(Self {
            cancel,
            handle: Some(tokio::spawn(pump.run())),
            state_rx,
            stats_rx,
            peer,
        })
    }

    /// Sink side: dial the source with a bounded connect timeout,
    /// then pump the wire into the `decoder` session (already bound
    /// to its render target).
    pub async fn connect(
        config: &StreamConfig,
        decoder: Box<dyn MediaSession>,
        info: &ConnectionInfo,
        connect_timeout: Duration,
    ) -> Result<Self, LinkError> {
        let conn = Connection::dial(info, connect_timeout).await?;
        let peer = conn.peer_addr();
        info!("decode session started for {peer}");

        let cancel = CancellationToken::new();
        let pump = DecodePump::new(
            decoder,
            conn.into_frame_stream(config.max_frame_size),
            cancel.clone(),
        );
        let state_rx = pump.state_receiver();
        let stats_rx = pump.stats_receiver();

        Ok(Self {
            cancel,
            handle: Some(tokio::spawn(pump.run())),
            state_rx,
            stats_rx,
            peer,
        })
    }

    /// Request a stop. Never blocks, never errors; repeat and
    /// concurrent calls are no-ops.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Current pump state.
    pub fn state(&self) -> PumpState {
        *self.state_rx.borrow()
    }

    /// Watch the pump's lifecycle state.
    pub fn state_receiver(&self) -> watch::Receiver<PumpState> {
        self.state_rx.clone()
    }

    /// Watch frame/byte counters (observability only).
    pub fn stats_receiver(&self) -> watch::Receiver<PumpStats> {
        self.stats_rx.clone()
    }

    /// The remote endpoint of this session.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Await the pump task and return its terminal status: `Ok` for a
    /// clean end (peer hangup or stop request), the first error
    /// otherwise.
    pub async fn join(mut self) -> Result<(), LinkError> {
        match self.handle.take() {
            Some(handle) => handle
                .await
                .unwrap_or_else(|e| Err(LinkError::Task(e.to_string()))),
            None => Ok(()),
        }
    }

    /// Stop and wait for teardown to finish.
    pub async fn shutdown(self) -> Result<(), LinkError> {
        self.stop();
        self.join().await
    }
}

//! Decode pump — reads framed units from the connection, feeds the
//! decoder's input queue, and drains rendered output.
//!
//! Each iteration: read one whole frame (the framed reader reassembles
//! it from however many socket reads it takes), acquire a decoder
//! input slot with a bounded wait — retrying, never dropping the
//! frame, if no slot is free in time — submit the payload with its
//! original timestamp and flags, then hand whatever decoder output is
//! currently available to the render target.
//!
//! The loop ends when the peer closes the stream (a normal result,
//! not a fault), on an I/O or protocol error, or on a stop request.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::FrameStream;
use crate::error::LinkError;
use crate::frame::Frame;
use crate::media::{MediaSession, OutputEvent};
use crate::pump::{PumpState, PumpStats, StateCell};

/// Bounded wait for a free decoder input slot.
const ACQUIRE_WAIT: Duration = Duration::from_millis(10);

/// Drain poll for decoder output: take only what is already there.
const DRAIN_WAIT: Duration = Duration::ZERO;

/// Moves framed units from the wire into a decoder session.
pub struct DecodePump {
    media: Box<dyn MediaSession>,
    stream: FrameStream,
    cancel: CancellationToken,
    state: StateCell,
    state_rx: watch::Receiver<PumpState>,
    stats_tx: watch::Sender<PumpStats>,
}

impl DecodePump {
    /// Create a pump over an open framed connection and a decoder
    /// session bound to its render target.
    pub fn new(
        media: Box<dyn MediaSession>,
        stream: FrameStream,
        cancel: CancellationToken,
    ) -> Self {
        let (state, state_rx) = StateCell::new();
        let (stats_tx, _) = watch::channel(PumpStats::default());
        Self {
            media,
            stream,
            cancel,
            state,
            state_rx,
            stats_tx,
        }
    }

    /// Watch the pump's lifecycle state.
    pub fn state_receiver(&self) -> watch::Receiver<PumpState> {
        self.state_rx.clone()
    }

    /// Watch frame/byte counters.
    pub fn stats_receiver(&self) -> watch::Receiver<PumpStats> {
        self.stats_tx.subscribe()
    }

    /// Run until the stream ends, a failure, or a stop request. The
    /// codec session is closed on the way out.
    pub async fn run(mut self) -> Result<(), LinkError> {
        self.state.advance(PumpState::Running);
        debug!("decode pump started");

        let cancel = self.cancel.clone();
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("decode pump: stop requested");
                Ok(())
            }
            r = self.drive() => r,
        };

        self.state.advance(PumpState::Stopping);
        self.media.close();
        self.state.advance(PumpState::Stopped);

        match result {
            Err(e) if e.is_clean_shutdown() => {
                debug!("decode pump: stream closed by peer");
                Ok(())
            }
            Err(e) => {
                warn!("decode pump failed: {e}");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn drive(&mut self) -> Result<(), LinkError> {
        let mut frames: u64 = 0;

        loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(e),
                None => {
                    debug!("stream ended, total frames: {frames}");
                    return Ok(());
                }
            };

            if frame.is_config() {
                debug!("received config frame: {} bytes", frame.size());
            }

            self.submit(&frame).await?;
            self.drain_output().await?;

            if !frame.is_config() {
                frames += 1;
                self.stats_tx.send_modify(|s| {
                    s.frames += 1;
                    s.bytes += frame.size() as u64;
                });
                if frames % 30 == 0 {
                    debug!("decoded {frames} frames");
                }
            }
        }
    }

    /// Submit one frame to the decoder's input queue.
    ///
    /// An acquire timeout only skips a cycle — the frame is held and
    /// retried until a slot frees up, never silently discarded.
    async fn submit(&mut self, frame: &Frame) -> Result<(), LinkError> {
        let slot = loop {
            match self.media.acquire_input_slot(ACQUIRE_WAIT).await? {
                Some(slot) => break slot,
                None => continue,
            }
        };
        self.media
            .submit(slot, &frame.payload, frame.timestamp_micros, frame.flags)
    }

    /// Hand whatever decoder output is currently available to the
    /// render target. Possibly nothing; that is fine.
    async fn drain_output(&mut self) -> Result<(), LinkError> {
        let mut first = self.stats_tx.borrow().frames == 0;
        while let Some(event) = self.media.next_output_event(DRAIN_WAIT).await? {
            match event {
                OutputEvent::FormatChanged(_) => {
                    debug!("decoder output format changed");
                }
                OutputEvent::Unit(unit) => {
                    // render = true presents the unit before the
                    // buffer is recycled.
                    self.media.release(unit.slot, true)?;
                    if first {
                        debug!("first frame decoded and rendered");
                        first = false;
                    }
                }
            }
        }
        Ok(())
    }
}

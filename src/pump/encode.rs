//! Encode pump — drains the encoder's output queue and writes framed
//! units to the connection.
//!
//! The loop classifies each dequeued event:
//!
//! - **Format changed**: the codec's initialization parameter sets are
//!   concatenated in declaration order and sent as exactly one
//!   `CODEC_CONFIG` frame.
//! - **Data unit**: forwarded only once configuration is on the wire
//!   (or when the unit itself carries `CODEC_CONFIG`) — the decoder
//!   must never see media before its configuration.
//! - **End of stream**: remaining bytes are forwarded, then the loop
//!   terminates.
//!
//! Output slots are returned to the encoder the moment their bytes
//! have been copied out, regardless of whether the send then
//! succeeds, so the encoder's buffer pool is never starved by a slow
//! or broken connection.

use std::time::Duration;

use futures::SinkExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::FrameSink;
use crate::error::LinkError;
use crate::frame::{Frame, FrameFlags};
use crate::media::{MediaSession, OutputEvent, OutputUnit};
use crate::pump::{PumpState, PumpStats, StateCell};

/// Bounded wait for one output-queue dequeue. Short enough that a
/// stop request is observed promptly.
const DEQUEUE_WAIT: Duration = Duration::from_millis(10);

/// Moves coded units from an encoder session onto the wire.
pub struct EncodePump {
    media: Box<dyn MediaSession>,
    sink: FrameSink,
    cancel: CancellationToken,
    state: StateCell,
    state_rx: watch::Receiver<PumpState>,
    stats_tx: watch::Sender<PumpStats>,
    config_sent: bool,
}

impl EncodePump {
    /// Create a pump over an already-producing encoder session and an
    /// open framed connection.
    pub fn new(media: Box<dyn MediaSession>, sink: FrameSink, cancel: CancellationToken) -> Self {
        let (state, state_rx) = StateCell::new();
        let (stats_tx, _) = watch::channel(PumpStats::default());
        Self {
            media,
            sink,
            cancel,
            state,
            state_rx,
            stats_tx,
            config_sent: false,
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

    /// Run until end of stream, a failure, or a stop request. The
    /// codec session is closed on the way out.
    pub async fn run(mut self) -> Result<(), LinkError> {
        self.state.advance(PumpState::Running);
        debug!("encode pump started");

        let cancel = self.cancel.clone();
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("encode pump: stop requested");
                Ok(())
            }
            r = self.drive() => r,
        };

        self.state.advance(PumpState::Stopping);
        self.media.close();
        self.state.advance(PumpState::Stopped);

        match result {
            Err(e) if e.is_clean_shutdown() => {
                debug!("encode pump: connection closed by peer");
                Ok(())
            }
            Err(e) => {
                warn!("encode pump failed: {e}");
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    async fn drive(&mut self) -> Result<(), LinkError> {
        let mut frames: u64 = 0;

        loop {
            let Some(event) = self.media.next_output_event(DEQUEUE_WAIT).await? else {
                // No unit within the bounded wait — just loop again.
                continue;
            };

            match event {
                OutputEvent::FormatChanged(params) => self.send_config(params).await?,
                OutputEvent::Unit(unit) => {
                    let end = unit.flags.contains(FrameFlags::END_OF_STREAM);
                    self.forward_unit(unit, &mut frames).await?;
                    if end {
                        debug!("end of stream, total frames: {frames}");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Send the one-time configuration frame.
    async fn send_config(&mut self, parameter_sets: Vec<Vec<u8>>) -> Result<(), LinkError> {
        if self.config_sent {
            // At most one config frame precedes the media stream.
            debug!("output format changed again; config already on the wire");
            return Ok(());
        }

        let total: usize = parameter_sets.iter().map(Vec::len).sum();
        if total == 0 {
            warn!("format change carried no parameter sets");
            return Ok(());
        }

        let mut data = Vec::with_capacity(total);
        for set in &parameter_sets {
            data.extend_from_slice(set);
        }

        debug!(
            "config frame sent: {total} bytes ({} parameter sets)",
            parameter_sets.len()
        );
        self.sink.send(Frame::config(data)).await?;
        self.config_sent = true;
        Ok(())
    }

    /// Forward one data unit, releasing its slot first.
    async fn forward_unit(
        &mut self,
        unit: OutputUnit,
        frames: &mut u64,
    ) -> Result<(), LinkError> {
        let OutputUnit {
            slot,
            data,
            timestamp_micros,
            flags,
        } = unit;

        // The slot goes back to the encoder pool as soon as its bytes
        // are copied out, before the send result is known.
        self.media.release(slot, false)?;

        if data.is_empty() {
            return Ok(());
        }
        if !self.config_sent && !flags.contains(FrameFlags::CODEC_CONFIG) {
            // Configuration frames must strictly precede dependent
            // media frames on the wire.
            debug!("suppressing {}-byte unit before config", data.len());
            return Ok(());
        }

        let len = data.len() as u64;
        self.sink
            .send(Frame::new(timestamp_micros, flags, data))
            .await?;

        *frames += 1;
        self.stats_tx.send_modify(|s| {
            s.frames += 1;
            s.bytes += len;
        });
        if *frames % 30 == 0 {
            debug!("encoded {frames} frames");
        }
        Ok(())
    }
}

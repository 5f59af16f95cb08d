//! Abstract codec capability — the buffer-queue contract the pumps
//! drive.
//!
//! A [`MediaSession`] models one side of a hardware (or software)
//! codec: a pool of input slots that accept coded bytes, and an output
//! queue that yields coded units or format-change notifications. The
//! transport core never inspects codec state beyond these operations;
//! the real encode/decode engine lives behind this trait, outside the
//! crate.
//!
//! A session is owned exclusively by the pump that drives it. Waits
//! are bounded so the owning pump can observe a stop request between
//! calls; `close` unblocks anything still pending inside the backing
//! engine.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LinkError;
use crate::frame::FrameFlags;

/// Handle to an acquired codec input buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSlot(pub usize);

/// Handle to a codec output buffer slot, returned via
/// [`MediaSession::release`] once its bytes have been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSlot(pub usize);

/// One dequeued codec output unit.
#[derive(Debug, Clone)]
pub struct OutputUnit {
    /// The slot backing this unit. Must be released promptly so the
    /// codec's buffer pool is not starved.
    pub slot: OutputSlot,
    /// The unit's coded bytes. May be empty for marker-only units
    /// (e.g. a bare end-of-stream signal).
    pub data: Bytes,
    /// Presentation timestamp in microseconds.
    pub timestamp_micros: i64,
    /// Buffer flags reported by the codec.
    pub flags: FrameFlags,
}

/// An event produced by the codec output queue.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    /// The output format changed. Carries the codec initialization
    /// parameter sets (SPS/PPS equivalents) in declaration order.
    FormatChanged(Vec<Vec<u8>>),
    /// A coded unit is available.
    Unit(OutputUnit),
}

/// Buffer-queue contract for an encoder or decoder session.
#[async_trait]
pub trait MediaSession: Send {
    /// Wait up to `timeout` for a free input buffer slot. `Ok(None)`
    /// means no slot became available in time — not an error.
    async fn acquire_input_slot(&mut self, timeout: Duration)
        -> Result<Option<InputSlot>, LinkError>;

    /// Copy `data` into `slot` and queue it for processing, tagged
    /// with the original timestamp and flags so the engine can treat
    /// configuration data specially.
    fn submit(
        &mut self,
        slot: InputSlot,
        data: &[u8],
        timestamp_micros: i64,
        flags: FrameFlags,
    ) -> Result<(), LinkError>;

    /// Wait up to `timeout` for the next output event. `Ok(None)`
    /// means nothing was available in time — not an error.
    async fn next_output_event(&mut self, timeout: Duration)
        -> Result<Option<OutputEvent>, LinkError>;

    /// Return an output slot to the codec's buffer pool. For a
    /// decoder bound to a render target, `render = true` presents the
    /// unit before the buffer is recycled.
    fn release(&mut self, slot: OutputSlot, render: bool) -> Result<(), LinkError>;

    /// Tear the session down, forcing any pending engine call to
    /// return. Safe to call more than once.
    fn close(&mut self);
}

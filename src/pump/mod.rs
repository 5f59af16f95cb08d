//! Pump loops — continuous movers between a codec buffer queue and a
//! framed TCP connection, one direction each.
//!
//! ```text
//! SOURCE                                     SINK
//! ┌──────────────────────────┐              ┌──────────────────────────┐
//! │ encoder MediaSession     │              │ FrameStream::next        │
//! │   ↓ next_output_event    │   TCP        │   ↓                      │
//! │ EncodePump               │ ──────────►  │ DecodePump               │
//! │   ↓                      │              │   ↓ submit               │
//! │ FrameSink::send          │              │ decoder MediaSession     │
//! └──────────────────────────┘              │   ↓ release(render=true) │
//!                                           │ render target            │
//!                                           └──────────────────────────┘
//! ```
//!
//! Each pump runs on its own spawned task. The only cross-task
//! interaction is the cancellation token every blocking point selects
//! against, so a stop request unblocks a pump within one iteration
//! even while it is waiting inside a socket or codec call.

pub mod decode;
pub mod encode;

use tokio::sync::watch;

pub use decode::DecodePump;
pub use encode::EncodePump;

// ── PumpState ────────────────────────────────────────────────────

/// Lifecycle state of a pump. Transitions are one-directional; there
/// is no restart after `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PumpState {
    #[default]
    Idle,
    Running,
    /// Entered on an external stop request or an internal failure;
    /// always leads to `Stopped`.
    Stopping,
    Stopped,
}

/// Publisher side of a pump's state, enforcing forward-only moves.
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<PumpState>,
}

impl StateCell {
    pub(crate) fn new() -> (Self, watch::Receiver<PumpState>) {
        let (tx, rx) = watch::channel(PumpState::Idle);
        (Self { tx }, rx)
    }

    /// Move to `next` if it is ahead of the current state; backwards
    /// moves are ignored.
    pub(crate) fn advance(&self, next: PumpState) {
        self.tx.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
    }
}

// ── PumpStats ────────────────────────────────────────────────────

/// Per-pump counters, published for observability only — never used
/// for control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Media frames moved (configuration frames excluded).
    pub frames: u64,
    /// Payload bytes moved.
    pub bytes: u64,
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_cell_moves_forward_only() {
        let (cell, rx) = StateCell::new();
        assert_eq!(*rx.borrow(), PumpState::Idle);

        cell.advance(PumpState::Running);
        assert_eq!(*rx.borrow(), PumpState::Running);

        cell.advance(PumpState::Stopped);
        assert_eq!(*rx.borrow(), PumpState::Stopped);

        // No restart after Stopped.
        cell.advance(PumpState::Running);
        assert_eq!(*rx.borrow(), PumpState::Stopped);
    }

    #[test]
    fn stopping_precedes_stopped() {
        assert!(PumpState::Stopping < PumpState::Stopped);
        assert!(PumpState::Idle < PumpState::Running);
    }
}

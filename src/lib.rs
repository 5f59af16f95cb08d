//! # screenlink
//!
//! Frame transport for live screen mirroring: a source device feeds
//! hardware-encoded video over a single TCP connection to a sink
//! device, where it is decoded and rendered.
//!
//! ```text
//! SOURCE                                        SINK
//! ┌─────────────────────────┐                 ┌─────────────────────────┐
//! │ capture → encoder       │                 │ decoder → render target │
//! │   (MediaSession)        │      TCP        │   (MediaSession)        │
//! │   ↓                     │ ─────────────►  │   ↑                     │
//! │ EncodePump              │  framed bytes   │ DecodePump              │
//! │   ↓                     │                 │   ↑                     │
//! │ FrameSink               │                 │ FrameStream             │
//! └─────────────────────────┘                 └─────────────────────────┘
//! ```
//!
//! The crate owns the wire framing, the two pump loops, and their
//! lifecycle. Capture, the concrete codec engine, and rendering live
//! behind the [`MediaSession`] contract, outside the crate.
//!
//! | Module       | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | `frame`      | Wire frame type, flag bits, 16-byte header         |
//! | `codec`      | `FrameCodec` for framed TCP I/O via `tokio_util`   |
//! | `media`      | Abstract codec capability (buffer-queue contract)  |
//! | `connection` | Accept-one listener, dialer, socket options        |
//! | `pump`       | Encode / decode pump loops, state, counters        |
//! | `session`    | Lifecycle controller: start order, idempotent stop |
//! | `config`     | Per-session stream parameters + TOML loading       |
//! | `error`      | `LinkError` — typed, `thiserror`-based hierarchy   |

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod media;
pub mod pump;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::FrameCodec;
pub use config::StreamConfig;
pub use connection::{Connection, ConnectionInfo, FrameSink, FrameStream, Listener};
pub use error::LinkError;
pub use frame::{Frame, FrameFlags, FrameHeader, HEADER_LEN, MAX_FRAME_SIZE};
pub use media::{InputSlot, MediaSession, OutputEvent, OutputSlot, OutputUnit};
pub use pump::{DecodePump, EncodePump, PumpState, PumpStats};
pub use session::StreamSession;

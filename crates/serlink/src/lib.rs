//! Half-duplex serial link protocol.
//!
//! serlink implements a character-oriented link discipline over a serial
//! line: LRC-checked frames, an ENQ/ACK selection handshake, and a bounded
//! timer-driven retransmission engine enforcing one in-flight message at a
//! time.
//!
//! # Crate Structure
//!
//! - [`transport`] — Serial-line transport (port open/enumerate, `LinkStream`)
//! - [`frame`] — Control codes, frame codec and byte-at-a-time assembly
//! - [`link`] — The protocol engine: sender state machine, retry cycles,
//!   event dispatch and running sessions

/// Re-export transport types.
pub mod transport {
    pub use serlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serlink_frame::*;
}

/// Re-export link-engine types.
pub mod link {
    pub use serlink_link::*;
}

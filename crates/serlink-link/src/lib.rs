//! Half-duplex link protocol engine.
//!
//! This is the layer that enforces the link discipline: exactly one in-flight
//! outgoing message, bounded timer-driven retransmission, and an explicit
//! selection handshake before any payload moves. [`Sender`] owns the outgoing
//! state machine, [`LinkController`] binds inbound link events to sender
//! reactions and control responses, and [`Link`] wraps both around a
//! transport's reader and writer halves as a running session.
//!
//! Two execution contexts touch the engine: the byte-delivery thread feeding
//! the controller, and the retry thread retransmitting the pending payload.
//! They share one lock-guarded state record and one serialized write path.

pub mod controller;
pub mod error;
pub mod link;
mod retry;
pub mod sender;
pub mod writer;

pub use controller::LinkController;
pub use error::{LinkError, Result};
pub use link::Link;
pub use sender::{LinkConfig, Sender};
pub use writer::SharedWriter;

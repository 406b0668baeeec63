//! Checksummed character framing for a half-duplex serial link.
//!
//! This is the wire-level layer of serlink. Every data message travels as a
//! frame: a start byte, a five-byte envelope, a two-digit ASCII length field,
//! the message text, an ETX terminator, and a trailing LRC checksum byte.
//! Between frames the peers speak in single control codes (ACK, NAK, ENQ,
//! EOT, PSC).
//!
//! [`FrameAssembler`] consumes the inbound stream one byte at a time and
//! classifies it into link events; [`Frame`] validates and constructs
//! complete frames.

pub mod assembler;
pub mod codec;
pub mod codes;
pub mod error;

pub use assembler::{FrameAssembler, LinkEvent};
pub use codec::{
    lrc, Frame, ENVELOPE_LEN, LENGTH_OFFSET, LENGTH_OVERHEAD, MAX_TEXT_LEN, MIN_FRAME_LEN,
};
pub use codes::{
    code_name, is_dispatch_code, ACK, ENQ, EOT, ETX, NAK, PSC, SELECTING_SEQUENCE, SELECT_TOKEN,
    STX,
};
pub use error::{FrameError, Result};

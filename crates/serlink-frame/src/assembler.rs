use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::codec::Frame;
use crate::codes::{ACK, ENQ, EOT, ETX, NAK, PSC, SELECT_TOKEN};
use crate::error::FrameError;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// What one inbound byte turned out to mean.
#[derive(Debug)]
pub enum LinkEvent {
    /// More bytes expected; nothing to act on yet.
    Accumulating,
    /// A complete frame passed both checks; the link owes the peer an ACK.
    Frame(Frame),
    /// A complete frame failed validation; the link owes the peer a NAK.
    BadFrame(FrameError),
    /// The peer acknowledged our last transmission.
    Ack,
    /// The peer rejected our last transmission.
    Nak,
    /// The peer asks for permission to send.
    Enquiry,
    /// The peer finished (or abandoned) its transmission.
    EndOfTransmission,
    /// The peer transmitted its selecting sequence at us.
    SelectRequest,
}

/// Reassembles the inbound byte stream into link events.
///
/// Fed one byte at a time, in arrival order, from a single consumer thread.
/// The internal buffer grows until a frame boundary or control code is
/// recognized; there is no inbound timeout, so a peer that stalls mid-frame
/// holds its partial bytes here indefinitely.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Classify the next inbound byte.
    ///
    /// A frame boundary (ETX in the second-to-last position) always wins over
    /// control-code matching: the byte that completes a frame is its checksum,
    /// whatever its value happens to collide with.
    pub fn feed(&mut self, byte: u8) -> LinkEvent {
        self.buf.put_u8(byte);
        trace!(len = self.buf.len(), byte, "assembling");

        if self.buf.len() > 2 && self.buf[self.buf.len() - 2] == ETX {
            let raw = self.buf.split().freeze();
            return match Frame::parse(raw) {
                Ok(frame) => {
                    debug!(size = frame.wire_size(), "frame assembled");
                    LinkEvent::Frame(frame)
                }
                Err(err) => {
                    debug!(%err, "frame rejected");
                    LinkEvent::BadFrame(err)
                }
            };
        }

        match byte {
            ACK => {
                self.buf.clear();
                LinkEvent::Ack
            }
            NAK => {
                self.buf.clear();
                LinkEvent::Nak
            }
            ENQ => {
                self.buf.clear();
                LinkEvent::Enquiry
            }
            EOT => {
                self.buf.clear();
                LinkEvent::EndOfTransmission
            }
            // The selecting sequence is the station token followed by PSC.
            // This branch leaves the buffer in place.
            PSC if self.buf[..self.buf.len() - 1] == SELECT_TOKEN => LinkEvent::SelectRequest,
            _ => LinkEvent::Accumulating,
        }
    }

    /// Drop any partially accumulated bytes.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes accumulated since the last frame boundary or reset.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

use std::io::Write;

use tracing::{debug, warn};

use serlink_frame::{Frame, FrameAssembler, LinkEvent, ACK, EOT, NAK};

use crate::sender::Sender;
use crate::writer::SharedWriter;

/// Glue between the inbound byte stream and the rest of the link.
///
/// Feeds each byte through the frame assembler and dispatches the resulting
/// event: validated frames are acknowledged and handed to the consumer,
/// rejected frames answered with NAK, and control codes routed to the sender.
/// Holds no protocol state of its own beyond the assembler's buffer.
pub struct LinkController<W: Write + Send + 'static> {
    assembler: FrameAssembler,
    sender: Sender<W>,
    writer: SharedWriter<W>,
    on_message: Box<dyn FnMut(Frame) + Send>,
}

impl<W: Write + Send + 'static> LinkController<W> {
    pub fn new(sender: Sender<W>, on_message: impl FnMut(Frame) + Send + 'static) -> Self {
        let writer = sender.writer();
        Self {
            assembler: FrameAssembler::new(),
            sender,
            writer,
            on_message: Box::new(on_message),
        }
    }

    /// Process one inbound byte.
    pub fn handle_byte(&mut self, byte: u8) {
        match self.assembler.feed(byte) {
            LinkEvent::Accumulating => {}
            LinkEvent::Frame(frame) => {
                self.writer.send_or_log(&[ACK], "frame acknowledgement");
                debug!(size = frame.wire_size(), "delivering frame");
                (self.on_message)(frame);
            }
            LinkEvent::BadFrame(err) => {
                warn!(%err, "answering NAK");
                self.writer.send_or_log(&[NAK], "frame rejection");
            }
            LinkEvent::Ack => self.sender.ack_received(),
            LinkEvent::Nak => self.sender.nak_received(),
            LinkEvent::Enquiry => {
                debug!("peer enquiry, granting permission to send");
                self.writer.send_or_log(&[ACK], "enquiry acknowledgement");
                self.sender.set_receiving(true);
            }
            LinkEvent::EndOfTransmission => self.sender.set_receiving(false),
            LinkEvent::SelectRequest => {
                debug!("peer selecting sequence, declining");
                self.writer.send_or_log(&[EOT], "selection decline");
            }
        }
    }

    /// Process a run of inbound bytes in arrival order.
    pub fn handle_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.handle_byte(*byte);
        }
    }

    /// Force-abort the link: clears sender state and any partial assembly.
    pub fn interrupt(&mut self) {
        self.sender.interrupt();
        self.assembler.reset();
    }

    pub fn sender(&self) -> &Sender<W> {
        &self.sender
    }
}

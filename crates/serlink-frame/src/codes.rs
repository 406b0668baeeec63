//! Wire-level control codes.
//!
//! The link is character-oriented: outside of a frame body, each of these
//! single bytes is a complete protocol message.

/// Frame start (first byte of a frame; excluded from the LRC).
pub const STX: u8 = 2;

/// Frame terminator; the byte after it is the LRC checksum.
pub const ETX: u8 = 3;

/// End of transmission.
pub const EOT: u8 = 4;

/// Enquiry — the peer requests permission to send.
pub const ENQ: u8 = 5;

/// Positive acknowledgement.
pub const ACK: u8 = 6;

/// Negative acknowledgement.
pub const NAK: u8 = 21;

/// Permission-to-send character, terminating a selecting sequence.
pub const PSC: u8 = 60;

/// Station token carried by the selecting sequence.
pub const SELECT_TOKEN: [u8; 2] = *b"16";

/// Selecting sequence: transmitted to initiate a message transfer, answered
/// with ACK by a peer willing to receive.
pub const SELECTING_SEQUENCE: [u8; 3] = [b'1', b'6', PSC];

/// Returns a human-readable name for a control code, if `byte` is one.
pub fn code_name(byte: u8) -> Option<&'static str> {
    match byte {
        STX => Some("STX"),
        ETX => Some("ETX"),
        EOT => Some("EOT"),
        ENQ => Some("ENQ"),
        ACK => Some("ACK"),
        NAK => Some("NAK"),
        PSC => Some("PSC"),
        _ => None,
    }
}

/// Returns true if the byte is dispatched as a standalone control code.
pub fn is_dispatch_code(byte: u8) -> bool {
    matches!(byte, ACK | NAK | ENQ | EOT | PSC)
}

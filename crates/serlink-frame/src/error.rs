/// Errors produced by frame validation and construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The byte sequence ended in a frame boundary but is shorter than the
    /// smallest possible frame.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// The length field at the fixed offset is not two ASCII digits.
    #[error("length field is not two ASCII digits")]
    BadLengthField,

    /// The declared length disagrees with the actual frame length.
    #[error("declared length {declared} does not match frame length {actual} minus overhead")]
    LengthMismatch { declared: usize, actual: usize },

    /// The trailing checksum byte disagrees with the computed LRC.
    #[error("checksum mismatch (computed {computed:#04x}, frame carries {found:#04x})")]
    ChecksumMismatch { computed: u8, found: u8 },

    /// The message text does not fit the two-digit length field.
    #[error("text too long for the two-digit length field ({len} bytes, max {max})")]
    TextTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;

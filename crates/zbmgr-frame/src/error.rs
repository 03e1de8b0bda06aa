/// Errors that can occur during frame building, assembly and decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 16-bit length field (or the configured limit).
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Command names are exactly two ASCII characters.
    #[error("invalid command name {0:?} (expected two ASCII characters)")]
    InvalidCommandName(String),

    /// An integer parameter does not fit the requested width.
    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange { value: u32, width: usize },

    /// A frame completed but its checksum byte does not match the payload.
    #[error("bad checksum {actual:#04x} (expected {expected:#04x})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The payload is shorter than the layout of its frame type requires.
    #[error("frame type {frame_type:#04x} needs {needed} payload bytes, got {actual}")]
    Truncated {
        frame_type: u8,
        needed: usize,
        actual: usize,
    },

    /// The frame has not finished assembling.
    #[error("frame is incomplete")]
    Incomplete,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

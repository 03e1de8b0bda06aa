use std::fmt;

/// Which of the reactor's readable sources an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The coordinator link (serial port or replay file).
    Link,
    /// The operator console.
    Console,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => f.write_str("link"),
            Self::Console => f.write_str("console"),
        }
    }
}

/// Errors that stop the reactor.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] zbmgr_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] zbmgr_frame::FrameError),

    /// A readable source returned zero bytes.
    #[error("end of stream on {origin}")]
    EndOfStream { origin: SourceKind },

    /// `poll(2)` reported an error condition on a source.
    #[error("error condition on {origin}")]
    SourceError { origin: SourceKind },

    /// Reading from or writing to a source failed.
    #[error("{origin} I/O error: {error}")]
    Io {
        origin: SourceKind,
        #[source]
        error: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReactorError>;

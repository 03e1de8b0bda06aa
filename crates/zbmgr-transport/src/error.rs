use std::path::PathBuf;

/// Errors that can occur while opening or polling byte sources.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device or file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The device opened but could not be put into raw mode.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested line speed has no termios constant.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The readiness wait itself failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),

    /// An I/O error occurred on a byte source.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

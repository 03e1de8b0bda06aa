//! Byte sources for the coordinator link.
//!
//! Provides a unified interface over the places raw frame bytes come from:
//! - A serial TTY wired to the coordinator radio (raw mode, fixed baud rate)
//! - A replay file of previously captured bytes
//! - The operator console (stdin)
//!
//! This is the lowest layer of zbmgr. Everything it hands out is `Read` and
//! `AsRawFd`, so the reactor can wait on it with [`poll_ready`].

#[cfg(not(unix))]
compile_error!("zbmgr-transport requires a Unix platform (termios and poll(2))");

pub mod console;
pub mod error;
pub mod poll;
pub mod replay;
pub mod serial;
pub mod traits;

pub use console::Console;
pub use error::{Result, TransportError};
pub use poll::{poll_ready, Interest, Readiness};
pub use replay::ReplayFile;
pub use serial::{SerialConfig, SerialPort, DEFAULT_BAUD_RATE};
pub use traits::{ByteSource, SerialStream};

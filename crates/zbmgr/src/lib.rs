//! Zigbee coordinator manager.
//!
//! zbmgr talks to an XBee-style coordinator radio over a serial line in API
//! mode: it assembles the escaped, checksummed frames the radio emits,
//! builds outgoing command and transmit frames, and dispatches inbound
//! frames to handlers by frame ID.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte sources: serial TTY, replay file, console, readiness polling
//! - [`frame`]: Frame assembly, escaping, checksums, building and decoding
//! - [`reactor`]: The single-threaded event loop and handler dispatch

/// Re-export transport types.
pub mod transport {
    pub use zbmgr_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use zbmgr_frame::*;
}

/// Re-export reactor types.
pub mod reactor {
    pub use zbmgr_reactor::*;
}

//! The coordinator event loop.
//!
//! A [`Reactor`] multiplexes the coordinator link and an optional operator
//! console with `poll(2)`, assembles frames one byte at a time and hands
//! each valid frame to a handler channel chosen by its frame ID.

pub mod error;
pub mod handler;
pub mod reactor;

pub use error::{ReactorError, Result, SourceKind};
pub use handler::{Dispatch, FrameHandler, HandlerTable};
pub use reactor::{Reactor, ReactorConfig, ReactorStats, Turn, DEFAULT_POLL_TIMEOUT};

//! API frame handling for XBee-style Zigbee radios.
//!
//! Every frame on the serial line is laid out as:
//! - A 0x7E start delimiter
//! - A 2-byte big-endian payload length
//! - The payload: frame type, (usually) a frame ID, type-specific fields
//! - A checksum byte making the payload sum to 0xFF
//!
//! In escaped mode every byte after the delimiter that collides with
//! 0x7E, 0x7D, 0x11 or 0x13 is sent as 0x7D followed by the byte XOR 0x20.

pub mod address;
pub mod assembler;
#[cfg(feature = "async")]
pub mod async_codec;
pub mod builder;
pub mod checksum;
pub mod codec;
pub mod decode;
pub mod dump;
pub mod error;
pub mod escape;
pub mod frame_id;
pub mod frame_type;
pub mod reader;
pub mod writer;

pub use address::{Address16, Address64};
pub use assembler::FrameAssembler;
#[cfg(feature = "async")]
pub use async_codec::ApiCodec;
pub use builder::{
    Command, CommandName, ExplicitTransmit, FrameBuilder, IntWidth, Parameter, RemoteCommand,
    Transmit,
};
pub use codec::{AssemblyState, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use decode::ApiFrame;
pub use dump::hexdump;
pub use error::{FrameError, Result};
pub use frame_id::{FrameIdGenerator, NO_CORRELATION};
pub use frame_type::{carries_frame_id, frame_type_name};
pub use reader::FrameReader;
pub use writer::FrameWriter;

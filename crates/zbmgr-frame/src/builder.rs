use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::address::{Address16, Address64};
use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::frame_id::FrameIdGenerator;
use crate::frame_type;

/// Remote command option: apply the change immediately.
pub const APPLY_CHANGES: u8 = 0x02;

/// A two-character command name such as `ND` or `WR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandName([u8; 2]);

impl CommandName {
    pub fn new(name: &str) -> Result<Self> {
        match name.as_bytes() {
            [a, b] if a.is_ascii_graphic() && b.is_ascii_graphic() => Ok(Self([*a, *b])),
            _ => Err(FrameError::InvalidCommandName(name.to_string())),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl FromStr for CommandName {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Width used when writing an integer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntWidth {
    /// 1, 2 or 4 bytes, whichever is the smallest that holds the value.
    #[default]
    Narrowest,
    One,
    Two,
    Four,
}

/// Optional argument of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// Sent as-is.
    Bytes(Bytes),
    /// Sent big-endian at the given width.
    Int { value: u32, width: IntWidth },
}

impl Parameter {
    /// An integer at the narrowest width that fits.
    pub fn int(value: u32) -> Self {
        Self::Int {
            value,
            width: IntWidth::Narrowest,
        }
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Bytes(data.into())
    }

    /// Append the wire form of the parameter to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Self::Bytes(data) => {
                dst.put_slice(data);
                Ok(())
            }
            Self::Int { value, width } => put_int(*value, *width, dst),
        }
    }
}

/// Write `value` big-endian at `width`.
pub fn put_int(value: u32, width: IntWidth, dst: &mut BytesMut) -> Result<()> {
    let bytes = match width {
        IntWidth::Narrowest if value <= 0xFF => 1,
        IntWidth::Narrowest if value <= 0xFFFF => 2,
        IntWidth::Narrowest => 4,
        IntWidth::One => 1,
        IntWidth::Two => 2,
        IntWidth::Four => 4,
    };
    if bytes < 4 && value >> (8 * bytes) != 0 {
        return Err(FrameError::ValueOutOfRange {
            value,
            width: bytes,
        });
    }
    dst.put_slice(&value.to_be_bytes()[4 - bytes..]);
    Ok(())
}

/// Remote command request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub destination: Address64,
    pub network: Address16,
    pub options: u8,
    pub command: CommandName,
    pub parameter: Option<Parameter>,
}

impl RemoteCommand {
    /// Broadcast the command to every node and apply it immediately.
    pub fn new(command: CommandName) -> Self {
        Self {
            destination: Address64::BROADCAST,
            network: Address16::UNKNOWN,
            options: APPLY_CHANGES,
            command,
            parameter: None,
        }
    }
}

/// Data transmit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    pub destination: Address64,
    pub network: Address16,
    pub radius: u8,
    pub options: u8,
    pub data: Bytes,
}

impl Transmit {
    /// Broadcast `data` with the default radius and options.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            destination: Address64::BROADCAST,
            network: Address16::UNKNOWN,
            radius: 0,
            options: 0,
            data: data.into(),
        }
    }
}

/// Data transmit request with explicit endpoints, cluster and profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitTransmit {
    pub destination: Address64,
    pub network: Address16,
    pub source_endpoint: u8,
    pub destination_endpoint: u8,
    pub cluster: u16,
    pub profile: u16,
    pub radius: u8,
    pub options: u8,
    pub data: Bytes,
}

impl ExplicitTransmit {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            destination: Address64::BROADCAST,
            network: Address16::UNKNOWN,
            source_endpoint: 0,
            destination_endpoint: 0,
            cluster: 0,
            profile: 0,
            radius: 0,
            options: 0,
            data: data.into(),
        }
    }
}

/// An outgoing request the [`FrameBuilder`] can serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Local {
        command: CommandName,
        parameter: Option<Parameter>,
    },
    Queued {
        command: CommandName,
        parameter: Option<Parameter>,
    },
    Remote(RemoteCommand),
    Transmit(Transmit),
    ExplicitTransmit(ExplicitTransmit),
}

impl Command {
    pub fn local(command: CommandName, parameter: Option<Parameter>) -> Self {
        Self::Local { command, parameter }
    }

    pub fn queued(command: CommandName, parameter: Option<Parameter>) -> Self {
        Self::Queued { command, parameter }
    }

    pub fn frame_type(&self) -> u8 {
        match self {
            Self::Local { .. } => frame_type::LOCAL_COMMAND,
            Self::Queued { .. } => frame_type::LOCAL_COMMAND_QUEUED,
            Self::Remote(_) => frame_type::REMOTE_COMMAND,
            Self::Transmit(_) => frame_type::TRANSMIT,
            Self::ExplicitTransmit(_) => frame_type::EXPLICIT_TRANSMIT,
        }
    }

    /// Append the type-specific fields (everything after the frame ID).
    pub fn encode_fields(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Self::Local { command, parameter } | Self::Queued { command, parameter } => {
                put_command(command, parameter.as_ref(), dst)
            }
            Self::Remote(remote) => {
                dst.put_slice(remote.destination.as_bytes());
                dst.put_slice(&remote.network.to_be_bytes());
                dst.put_u8(remote.options);
                put_command(&remote.command, remote.parameter.as_ref(), dst)
            }
            Self::Transmit(tx) => {
                dst.put_slice(tx.destination.as_bytes());
                dst.put_slice(&tx.network.to_be_bytes());
                dst.put_u8(tx.radius);
                dst.put_u8(tx.options);
                dst.put_slice(&tx.data);
                Ok(())
            }
            Self::ExplicitTransmit(tx) => {
                dst.put_slice(tx.destination.as_bytes());
                dst.put_slice(&tx.network.to_be_bytes());
                dst.put_u8(tx.source_endpoint);
                dst.put_u8(tx.destination_endpoint);
                dst.put_u16(tx.cluster);
                dst.put_u16(tx.profile);
                dst.put_u8(tx.radius);
                dst.put_u8(tx.options);
                dst.put_slice(&tx.data);
                Ok(())
            }
        }
    }
}

fn put_command(
    command: &CommandName,
    parameter: Option<&Parameter>,
    dst: &mut BytesMut,
) -> Result<()> {
    dst.put_slice(command.as_bytes());
    match parameter {
        Some(parameter) => parameter.encode_into(dst),
        None => Ok(()),
    }
}

/// Serializes [`Command`]s into frames, tagging each with a frame ID.
#[derive(Debug)]
pub struct FrameBuilder {
    ids: FrameIdGenerator,
    escaped: bool,
}

impl FrameBuilder {
    /// Create a builder for the escaped API mode.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            ids: FrameIdGenerator::new(),
            escaped: config.escaped,
        }
    }

    /// Build the unescaped frame for `command`.
    ///
    /// Without an explicit `frame_id` the next ID from the builder's
    /// generator is used.
    pub fn build(&mut self, command: &Command, frame_id: Option<u8>) -> Result<Frame> {
        let frame_id = frame_id.unwrap_or_else(|| self.ids.next());

        let mut payload = BytesMut::with_capacity(32);
        payload.put_u8(command.frame_type());
        payload.put_u8(frame_id);
        command.encode_fields(&mut payload)?;

        trace!(
            frame_type = frame_type::frame_type_name(command.frame_type()),
            frame_id,
            len = payload.len(),
            "built frame"
        );
        Frame::from_payload(&payload)
    }

    /// Build `command` and encode it for the wire in the configured mode.
    pub fn build_wire(&mut self, command: &Command, frame_id: Option<u8>) -> Result<Bytes> {
        Ok(self.build(command, frame_id)?.encode(self.escaped))
    }

    /// Whether [`FrameBuilder::build_wire`] byte-stuffs its output.
    pub fn escaped(&self) -> bool {
        self.escaped
    }

    pub fn frame_ids(&self) -> &FrameIdGenerator {
        &self.ids
    }

    /// Restart frame ID numbering at 1.
    pub fn reset_frame_ids(&mut self) {
        self.ids.reset();
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

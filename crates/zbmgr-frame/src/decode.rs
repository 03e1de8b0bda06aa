//! Typed view of a frame's payload.

use bytes::Bytes;

use crate::address::{Address16, Address64};
use crate::codec::Frame;
use crate::error::{FrameError, Result};
use crate::frame_type::{self, frame_type_name};

/// A frame payload decoded according to its frame type.
///
/// Command names and data are kept as raw bytes: the decoder reports what
/// was on the wire, not what a builder would accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFrame {
    LocalCommand {
        frame_id: u8,
        command: Bytes,
        parameter: Bytes,
    },
    QueuedLocalCommand {
        frame_id: u8,
        command: Bytes,
        parameter: Bytes,
    },
    RemoteCommand {
        frame_id: u8,
        destination: Address64,
        network: Address16,
        options: u8,
        command: Bytes,
        parameter: Bytes,
    },
    Transmit {
        frame_id: u8,
        destination: Address64,
        network: Address16,
        radius: u8,
        options: u8,
        data: Bytes,
    },
    ExplicitTransmit {
        frame_id: u8,
        destination: Address64,
        network: Address16,
        source_endpoint: u8,
        destination_endpoint: u8,
        cluster: u16,
        profile: u16,
        radius: u8,
        options: u8,
        data: Bytes,
    },
    LocalCommandResponse {
        frame_id: u8,
        command: Bytes,
        status: u8,
        data: Bytes,
    },
    ModemStatus {
        status: u8,
    },
    TransmitStatus {
        frame_id: u8,
        network: Address16,
        retry_count: u8,
        delivery_status: u8,
        discovery_status: u8,
    },
    ReceivePacket {
        source: Address64,
        network: Address16,
        options: u8,
        data: Bytes,
    },
    RemoteCommandResponse {
        frame_id: u8,
        source: Address64,
        network: Address16,
        command: Bytes,
        status: u8,
        data: Bytes,
    },
    /// Any frame type without a typed layout, body kept verbatim
    /// (everything after the type byte).
    Unrecognized {
        frame_type: u8,
        body: Bytes,
    },
}

impl ApiFrame {
    /// Decode a payload (frame type onwards, checksum excluded).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let Some((&kind, body)) = payload.split_first() else {
            return Err(FrameError::Truncated {
                frame_type: 0,
                needed: 1,
                actual: 0,
            });
        };
        let mut fields = Fields::new(kind, body);

        let decoded = match kind {
            frame_type::LOCAL_COMMAND => Self::LocalCommand {
                frame_id: fields.u8()?,
                command: fields.up_to(2),
                parameter: fields.rest(),
            },
            frame_type::LOCAL_COMMAND_QUEUED => Self::QueuedLocalCommand {
                frame_id: fields.u8()?,
                command: fields.up_to(2),
                parameter: fields.rest(),
            },
            frame_type::REMOTE_COMMAND => Self::RemoteCommand {
                frame_id: fields.u8()?,
                destination: fields.address64()?,
                network: fields.address16()?,
                options: fields.u8()?,
                command: fields.up_to(2),
                parameter: fields.rest(),
            },
            frame_type::TRANSMIT => Self::Transmit {
                frame_id: fields.u8()?,
                destination: fields.address64()?,
                network: fields.address16()?,
                radius: fields.u8()?,
                options: fields.u8()?,
                data: fields.rest(),
            },
            frame_type::EXPLICIT_TRANSMIT => Self::ExplicitTransmit {
                frame_id: fields.u8()?,
                destination: fields.address64()?,
                network: fields.address16()?,
                source_endpoint: fields.u8()?,
                destination_endpoint: fields.u8()?,
                cluster: fields.u16()?,
                profile: fields.u16()?,
                radius: fields.u8()?,
                options: fields.u8()?,
                data: fields.rest(),
            },
            frame_type::LOCAL_COMMAND_RESPONSE => Self::LocalCommandResponse {
                frame_id: fields.u8()?,
                command: fields.exact(2)?,
                status: fields.u8()?,
                data: fields.rest(),
            },
            frame_type::MODEM_STATUS => Self::ModemStatus {
                status: fields.u8()?,
            },
            frame_type::TRANSMIT_STATUS => Self::TransmitStatus {
                frame_id: fields.u8()?,
                network: fields.address16()?,
                retry_count: fields.u8()?,
                delivery_status: fields.u8()?,
                discovery_status: fields.u8()?,
            },
            frame_type::RECEIVE_PACKET => Self::ReceivePacket {
                source: fields.address64()?,
                network: fields.address16()?,
                options: fields.u8()?,
                data: fields.rest(),
            },
            frame_type::REMOTE_COMMAND_RESPONSE => Self::RemoteCommandResponse {
                frame_id: fields.u8()?,
                source: fields.address64()?,
                network: fields.address16()?,
                command: fields.exact(2)?,
                status: fields.u8()?,
                data: fields.rest(),
            },
            other => Self::Unrecognized {
                frame_type: other,
                body: fields.rest(),
            },
        };
        Ok(decoded)
    }

    pub fn frame_type(&self) -> u8 {
        match self {
            Self::LocalCommand { .. } => frame_type::LOCAL_COMMAND,
            Self::QueuedLocalCommand { .. } => frame_type::LOCAL_COMMAND_QUEUED,
            Self::RemoteCommand { .. } => frame_type::REMOTE_COMMAND,
            Self::Transmit { .. } => frame_type::TRANSMIT,
            Self::ExplicitTransmit { .. } => frame_type::EXPLICIT_TRANSMIT,
            Self::LocalCommandResponse { .. } => frame_type::LOCAL_COMMAND_RESPONSE,
            Self::ModemStatus { .. } => frame_type::MODEM_STATUS,
            Self::TransmitStatus { .. } => frame_type::TRANSMIT_STATUS,
            Self::ReceivePacket { .. } => frame_type::RECEIVE_PACKET,
            Self::RemoteCommandResponse { .. } => frame_type::REMOTE_COMMAND_RESPONSE,
            Self::Unrecognized { frame_type, .. } => *frame_type,
        }
    }

    /// Registry name of the frame type.
    pub fn name(&self) -> &'static str {
        frame_type_name(self.frame_type())
    }

    /// The correlation ID, for layouts that carry one.
    pub fn frame_id(&self) -> Option<u8> {
        match self {
            Self::LocalCommand { frame_id, .. }
            | Self::QueuedLocalCommand { frame_id, .. }
            | Self::RemoteCommand { frame_id, .. }
            | Self::Transmit { frame_id, .. }
            | Self::ExplicitTransmit { frame_id, .. }
            | Self::LocalCommandResponse { frame_id, .. }
            | Self::TransmitStatus { frame_id, .. }
            | Self::RemoteCommandResponse { frame_id, .. } => Some(*frame_id),
            Self::ModemStatus { .. } | Self::ReceivePacket { .. } | Self::Unrecognized { .. } => {
                None
            }
        }
    }
}

impl Frame {
    /// Decode the payload of a complete frame.
    pub fn decode(&self) -> Result<ApiFrame> {
        if !self.is_complete() {
            return Err(FrameError::Incomplete);
        }
        ApiFrame::decode(self.payload())
    }
}

/// Sequential big-endian field reader over a frame body.
struct Fields<'a> {
    frame_type: u8,
    body: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(frame_type: u8, body: &'a [u8]) -> Self {
        Self {
            frame_type,
            body,
            pos: 0,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.body.len() {
            return Err(FrameError::Truncated {
                frame_type: self.frame_type,
                needed: end + 1,
                actual: self.body.len() + 1,
            });
        }
        let slice = &self.body[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn address64(&mut self) -> Result<Address64> {
        let mut addr = [0u8; 8];
        addr.copy_from_slice(self.take(8)?);
        Ok(Address64(addr))
    }

    fn address16(&mut self) -> Result<Address16> {
        self.u16().map(Address16)
    }

    fn exact(&mut self, n: usize) -> Result<Bytes> {
        self.take(n).map(Bytes::copy_from_slice)
    }

    /// Up to `n` bytes, fewer if the body ends first.
    fn up_to(&mut self, n: usize) -> Bytes {
        let end = (self.pos + n).min(self.body.len());
        let slice = &self.body[self.pos..end];
        self.pos = end;
        Bytes::copy_from_slice(slice)
    }

    fn rest(&mut self) -> Bytes {
        let slice = &self.body[self.pos..];
        self.pos = self.body.len();
        Bytes::copy_from_slice(slice)
    }
}

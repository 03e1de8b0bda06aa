use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::assembler::FrameAssembler;
use crate::codec::{AssemblyState, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// `tokio_util` codec for API frames.
///
/// Decoding yields valid frames only; frames with a bad checksum are logged
/// and skipped so a `FramedRead` keeps streaming.
#[derive(Debug, Default)]
pub struct ApiCodec {
    assembler: FrameAssembler,
}

impl ApiCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            assembler: FrameAssembler::with_config(config),
        }
    }

    pub fn config(&self) -> &FrameConfig {
        self.assembler.config()
    }
}

impl Decoder for ApiCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            let consumed = self.assembler.feed(src);
            src.advance(consumed);

            let Some(frame) = self.assembler.take() else {
                return Ok(None);
            };
            match frame.verify() {
                Ok(()) => return Ok(Some(frame)),
                Err(err) => warn!(error = %err, "skipping frame"),
            }
        }
    }

    /// A stream that ends partway through a frame is reported as
    /// `ConnectionClosed`, matching [`FrameReader`](crate::FrameReader).
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        let state = self.assembler.state();
        if state == AssemblyState::Empty {
            return Ok(None);
        }
        debug!(?state, "end of stream inside a frame");
        self.assembler.reset();
        Err(FrameError::ConnectionClosed)
    }
}

impl Encoder<&Frame> for ApiCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        if !frame.is_complete() {
            return Err(FrameError::Incomplete);
        }
        let config = self.assembler.config();
        if frame.payload().len() > config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload().len(),
                max: config.max_payload_size,
            });
        }
        frame.encode_into(config.escaped, dst);
        Ok(())
    }
}

impl Encoder<Frame> for ApiCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&Frame>::encode(self, &frame, dst)
    }
}

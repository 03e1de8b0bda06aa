use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// A file of previously captured coordinator bytes, read back as if it were
/// the serial line. Writes are accepted and discarded.
pub struct ReplayFile;

impl ReplayFile {
    /// Open a capture file for replay.
    pub fn open(path: impl AsRef<Path>) -> Result<SerialStream> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TransportError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(?path, "replaying captured bytes");
        Ok(SerialStream::from_replay(file))
    }
}

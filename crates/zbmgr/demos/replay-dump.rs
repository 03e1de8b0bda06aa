//! Dump every frame in a capture file.
//!
//! Usage: cargo run -p zbmgr --example replay-dump -- capture.bin

use zbmgr::frame::{FrameError, FrameReader};
use zbmgr::transport::ReplayFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: replay-dump <capture file>")?;
    let mut reader = FrameReader::new(ReplayFile::open(&path)?);

    let mut seq = 0u64;
    loop {
        match reader.read_frame() {
            Ok(frame) => {
                seq += 1;
                let name = frame.decode().map(|api| api.name()).unwrap_or("undecodable");
                println!("{seq} {name}");
                println!("{frame}");
            }
            Err(FrameError::ChecksumMismatch { expected, actual }) => {
                println!("bad checksum {actual:#04x} (expected {expected:#04x})");
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(err.into()),
        }
    }
    println!("{seq} frames, {} stray bytes", reader.dropped_bytes());
    Ok(())
}

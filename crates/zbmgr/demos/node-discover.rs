//! Ask the coordinator for its neighbours and print the responses.
//!
//! Usage: cargo run -p zbmgr --example node-discover -- /dev/ttyUSB0 [baud]

use std::time::{Duration, Instant};

use zbmgr::frame::{ApiFrame, Command, CommandName};
use zbmgr::reactor::{Reactor, ReactorConfig};
use zbmgr::transport::{SerialConfig, SerialPort};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let device = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud_rate = match args.next() {
        Some(speed) => speed.parse()?,
        None => 9600,
    };

    let link = SerialPort::open(&device, &SerialConfig { baud_rate })?;
    let config = ReactorConfig {
        poll_timeout: Duration::from_millis(500),
        ..ReactorConfig::default()
    };
    let mut reactor = Reactor::with_config(link, config);

    let request = reactor.send_command(&Command::local(CommandName::new("ND")?, None), None)?;
    let frame_id = request.frame_id().unwrap_or_default();
    let responses = reactor.handlers().register(frame_id);
    println!("sent ND with frame id {frame_id}");

    // The radio answers once per node found, within its discovery timeout.
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        reactor.turn()?;
        while let Ok(frame) = responses.try_recv() {
            match frame.decode()? {
                ApiFrame::LocalCommandResponse { status, data, .. } => {
                    println!("status={status} node={}", zbmgr::frame::hexdump(&data, 16, None));
                }
                other => println!("unexpected {}", other.name()),
            }
        }
    }
    Ok(())
}

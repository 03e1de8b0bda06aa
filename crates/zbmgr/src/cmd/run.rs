use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::{info, warn};
use zbmgr_frame::{Command, CommandName, Frame, FrameConfig};
use zbmgr_reactor::{Reactor, ReactorConfig, ReactorError, SourceKind};
use zbmgr_transport::{ReplayFile, SerialConfig, SerialPort};

use crate::cmd::{parse_duration, parse_send, RunArgs};
use crate::exit::{frame_error, reactor_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_timeout = parse_duration(&args.poll_timeout)?;
    let startup = startup_commands(&args.send)?;

    let link = match &args.testing {
        Some(path) => ReplayFile::open(path)
            .map_err(|err| transport_error(&format!("cannot replay {}", path.display()), err))?,
        None => SerialPort::open(
            &args.coordinator,
            &SerialConfig {
                baud_rate: args.speed,
            },
        )
        .map_err(|err| {
            transport_error(&format!("cannot open {}", args.coordinator.display()), err)
        })?,
    };
    let replay = link.is_replay();

    let config = ReactorConfig {
        poll_timeout,
        frame: FrameConfig {
            escaped: !args.no_escape,
            ..FrameConfig::default()
        },
        console: !args.no_console,
    };
    let mut reactor = Reactor::with_config(link, config);
    let frames = reactor.handlers().register_default();
    install_ctrlc_handler(reactor.stop_handle())?;

    for command in &startup {
        let frame = reactor
            .send_command(command, None)
            .map_err(|err| reactor_error("cannot queue command", err))?;
        info!(frame_id = ?frame.frame_id(), "queued startup command");
    }

    let stop = reactor.stop_handle();
    let mut printer = Printer {
        frames,
        format,
        printed: 0,
        limit: args.count,
    };

    while !stop.load(Ordering::SeqCst) {
        let turned = reactor.turn();
        if printer.drain() {
            return Ok(SUCCESS);
        }
        match turned {
            Ok(_) => {}
            Err(ReactorError::EndOfStream { origin }) if replay || origin == SourceKind::Console => {
                info!(source = %origin, stats = ?reactor.stats(), "input exhausted");
                return Ok(SUCCESS);
            }
            Err(err) => {
                warn!(stats = ?reactor.stats(), "reactor stopped");
                return Err(reactor_error("coordinator link failed", err));
            }
        }
    }

    info!(stats = ?reactor.stats(), "interrupted");
    Ok(SUCCESS)
}

/// The default handler: prints each frame with a running sequence number.
struct Printer {
    frames: Receiver<Frame>,
    format: OutputFormat,
    printed: u64,
    limit: Option<u64>,
}

impl Printer {
    /// Print everything dispatched so far. Returns true once the frame
    /// limit has been reached.
    fn drain(&mut self) -> bool {
        while let Ok(frame) = self.frames.try_recv() {
            self.printed += 1;
            print_frame(self.printed, &frame, self.format);
            if self.limit.is_some_and(|limit| self.printed >= limit) {
                return true;
            }
        }
        false
    }
}

fn startup_commands(args: &[String]) -> CliResult<Vec<Command>> {
    args.iter()
        .map(|arg| {
            let (name, parameter) = parse_send(arg)?;
            let name = CommandName::new(&name).map_err(|err| frame_error("--send", err))?;
            Ok(Command::local(name, parameter))
        })
        .collect()
}

fn install_ctrlc_handler(stop: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

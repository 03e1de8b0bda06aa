use std::fs;

use tracing::warn;
use zbmgr_frame::{AssemblyState, Frame, FrameAssembler, FrameConfig};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_checksum_failure, print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = match (&args.hex, &args.file) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(path)) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (None, None) => return Err(CliError::usage("either a file or --hex is required")),
    };

    let config = FrameConfig {
        escaped: !args.no_escape,
        ..FrameConfig::default()
    };
    let (frames, trailing) = assemble_all(&wire, config);

    let mut bad = 0usize;
    for (index, frame) in frames.iter().enumerate() {
        let seq = index as u64 + 1;
        if frame.is_valid() {
            print_frame(seq, frame, format);
        } else {
            bad += 1;
            print_checksum_failure(seq, frame, format);
        }
    }
    if trailing != AssemblyState::Empty {
        warn!(state = ?trailing, "input ends inside a frame");
    }

    if frames.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no complete frame in input"));
    }
    if bad > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{bad} of {} frames failed the checksum", frames.len()),
        ));
    }
    Ok(SUCCESS)
}

/// Every frame that completes in `wire`, valid or not, and the state the
/// assembler is left in.
fn assemble_all(wire: &[u8], config: FrameConfig) -> (Vec<Frame>, AssemblyState) {
    let mut assembler = FrameAssembler::with_config(config);
    let mut frames = Vec::new();
    let mut rest = wire;

    while !rest.is_empty() {
        let consumed = assembler.feed(rest);
        rest = &rest[consumed..];
        if let Some(frame) = assembler.take() {
            frames.push(frame);
        }
    }
    (frames, assembler.state())
}

use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use zbmgr_frame::{Address16, Address64, IntWidth, Parameter};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod build;
pub mod decode;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the coordinator and print every frame it sends.
    Run(RunArgs),
    /// Build one outgoing frame and print it.
    Build(BuildArgs),
    /// Assemble and decode frames from captured bytes.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Build(args) => build::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial device of the coordinator radio.
    #[arg(
        long,
        short = 'c',
        env = "ZBMGR_COORDINATOR",
        default_value = "/dev/ttyUSB0"
    )]
    pub coordinator: PathBuf,
    /// Serial line speed in baud.
    #[arg(long, short = 'b', env = "ZBMGR_SPEED", default_value_t = 9600)]
    pub speed: u32,
    /// Replay captured bytes from FILE instead of opening the serial device.
    #[arg(long, short = 't', value_name = "FILE")]
    pub testing: Option<PathBuf>,
    /// Do not read frame bytes from stdin.
    #[arg(long)]
    pub no_console: bool,
    /// Queue a local command at startup, e.g. `ND` or `NI=garden` or `D0=5`.
    #[arg(long, value_name = "CMD[=PARAM]")]
    pub send: Vec<String>,
    /// Readiness wait before a timeout diagnostic (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub poll_timeout: String,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Talk to a radio in unescaped API mode.
    #[arg(long)]
    pub no_escape: bool,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(subcommand)]
    pub variant: BuildVariant,
    /// Frame ID to use (1-255, 0 for no response). Default: 1.
    #[arg(long, global = true, value_parser = parse_u8)]
    pub frame_id: Option<u8>,
    /// Encode without byte stuffing.
    #[arg(long, global = true)]
    pub no_escape: bool,
}

#[derive(Subcommand, Debug)]
pub enum BuildVariant {
    /// Local command, applied immediately.
    At(LocalArgs),
    /// Local command, queued until applied.
    Queue(LocalArgs),
    /// Command for a remote radio.
    Remote(RemoteArgs),
    /// Data transmit.
    Tx(TransmitArgs),
    /// Data transmit with explicit endpoints, cluster and profile.
    Explicit(ExplicitArgs),
}

#[derive(Args, Debug)]
pub struct LocalArgs {
    /// Two-character command name, e.g. ND.
    pub command: String,
    #[command(flatten)]
    pub param: ParamArgs,
}

#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Two-character command name, e.g. D0.
    pub command: String,
    #[command(flatten)]
    pub address: AddressArgs,
    /// Remote command options.
    #[arg(long, default_value = "2", value_parser = parse_u8)]
    pub options: u8,
    #[command(flatten)]
    pub param: ParamArgs,
}

#[derive(Args, Debug)]
pub struct TransmitArgs {
    #[command(flatten)]
    pub address: AddressArgs,
    /// Maximum hops (0 = network maximum).
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub radius: u8,
    /// Transmit options.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub options: u8,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct ExplicitArgs {
    #[command(flatten)]
    pub address: AddressArgs,
    /// Source endpoint.
    #[arg(long, default_value = "0xe8", value_parser = parse_u8)]
    pub source_endpoint: u8,
    /// Destination endpoint.
    #[arg(long, default_value = "0xe8", value_parser = parse_u8)]
    pub destination_endpoint: u8,
    /// Cluster ID.
    #[arg(long, default_value = "0x0011", value_parser = parse_u16)]
    pub cluster: u16,
    /// Profile ID.
    #[arg(long, default_value = "0xc105", value_parser = parse_u16)]
    pub profile: u16,
    /// Maximum hops (0 = network maximum).
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub radius: u8,
    /// Transmit options.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub options: u8,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// 64-bit destination address (16 hex digits). Default: broadcast.
    #[arg(long, value_name = "ADDR64")]
    pub dest: Option<Address64>,
    /// 16-bit network address (4 hex digits). Default: fffe (unknown).
    #[arg(long, value_name = "ADDR16")]
    pub network: Option<Address16>,
}

#[derive(Args, Debug)]
pub struct ParamArgs {
    /// Integer parameter (decimal or 0x-prefixed hex).
    #[arg(long, conflicts_with_all = ["text", "hex"], value_parser = parse_u32)]
    pub int: Option<u32>,
    /// Byte width for --int (1, 2 or 4). Default: narrowest that fits.
    #[arg(long, requires = "int", value_parser = parse_width)]
    pub width: Option<IntWidth>,
    /// Text parameter, sent as its bytes.
    #[arg(long, conflicts_with_all = ["int", "hex"])]
    pub text: Option<String>,
    /// Raw parameter bytes as hex.
    #[arg(long, conflicts_with_all = ["int", "text"])]
    pub hex: Option<String>,
}

impl ParamArgs {
    pub fn parameter(&self) -> CliResult<Option<Parameter>> {
        if let Some(value) = self.int {
            return Ok(Some(Parameter::Int {
                value,
                width: self.width.unwrap_or_default(),
            }));
        }
        if let Some(text) = &self.text {
            return Ok(Some(Parameter::bytes(text.clone().into_bytes())));
        }
        if let Some(hex) = &self.hex {
            return Ok(Some(Parameter::bytes(parse_hex(hex)?)));
        }
        Ok(None)
    }
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Payload text.
    #[arg(long, conflicts_with = "data_hex")]
    pub data: Option<String>,
    /// Payload bytes as hex.
    #[arg(long, conflicts_with = "data")]
    pub data_hex: Option<String>,
}

impl DataArgs {
    pub fn bytes(&self) -> CliResult<Vec<u8>> {
        match (&self.data, &self.data_hex) {
            (Some(text), _) => Ok(text.clone().into_bytes()),
            (None, Some(hex)) => parse_hex(hex),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File of captured wire bytes.
    #[arg(conflicts_with = "hex", required_unless_present = "hex")]
    pub file: Option<PathBuf>,
    /// Wire bytes as hex text, e.g. "7e 00 02 08 01 f6".
    #[arg(long)]
    pub hex: Option<String>,
    /// The bytes were captured in unescaped API mode.
    #[arg(long)]
    pub no_escape: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex text. Whitespace, `:` and `-` separators and a leading `0x`
/// are ignored.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CliError::usage(format!(
            "invalid hex digit {bad:?} in {input:?}"
        )));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!(
            "hex input has an odd number of digits: {input}"
        )));
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let text = String::from_utf8_lossy(pair);
            u8::from_str_radix(&text, 16)
                .map_err(|_| CliError::usage(format!("invalid hex byte {text:?}")))
        })
        .collect()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

fn parse_u32(input: &str) -> Result<u32, String> {
    let parsed = match input.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid integer {input:?}: {err}"))
}

fn parse_u16(input: &str) -> Result<u16, String> {
    let value = parse_u32(input)?;
    u16::try_from(value).map_err(|_| format!("{input} does not fit in 16 bits"))
}

fn parse_u8(input: &str) -> Result<u8, String> {
    let value = parse_u32(input)?;
    u8::try_from(value).map_err(|_| format!("{input} does not fit in 8 bits"))
}

fn parse_width(input: &str) -> Result<IntWidth, String> {
    match input {
        "1" => Ok(IntWidth::One),
        "2" => Ok(IntWidth::Two),
        "4" => Ok(IntWidth::Four),
        other => Err(format!("width must be 1, 2 or 4, got {other}")),
    }
}

/// Parse a `--send` value: `CMD` or `CMD=PARAM`. Integer-looking
/// parameters are sent as integers, anything else as text.
pub fn parse_send(arg: &str) -> CliResult<(String, Option<Parameter>)> {
    match arg.split_once('=') {
        None => Ok((arg.to_string(), None)),
        Some((command, "")) => Ok((command.to_string(), None)),
        Some((command, param)) => {
            let parameter = match parse_u32(param) {
                Ok(value) => Parameter::int(value),
                Err(_) => Parameter::bytes(param.as_bytes().to_vec()),
            };
            Ok((command.to_string(), Some(parameter)))
        }
    }
}

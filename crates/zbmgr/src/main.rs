mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "zbmgr", version, about = "Zigbee coordinator manager")]
struct Cli {
    /// Output format (default: pretty on a terminal, json otherwise).
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::BuildVariant;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["zbmgr", "run"]).expect("run should parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.speed, 9600);
        assert_eq!(args.coordinator.to_str(), Some("/dev/ttyUSB0"));
        assert_eq!(args.poll_timeout, "5s");
        assert!(!args.no_console);
    }

    #[test]
    fn run_short_flags() {
        let cli = Cli::try_parse_from([
            "zbmgr", "run", "-c", "/dev/ttyUSB1", "-b", "115200", "-t", "capture.bin",
        ])
        .expect("short flags should parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.coordinator.to_str(), Some("/dev/ttyUSB1"));
        assert_eq!(args.speed, 115200);
        assert_eq!(args.testing.as_deref().and_then(|p| p.to_str()), Some("capture.bin"));
    }

    #[test]
    fn run_accepts_repeated_send() {
        let cli = Cli::try_parse_from([
            "zbmgr", "run", "--testing", "capture.bin", "--send", "ND", "--send", "NI=hub",
        ])
        .expect("run args should parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.send, vec!["ND", "NI=hub"]);
        assert!(args.testing.is_some());
    }

    #[test]
    fn build_flags_after_variant() {
        let cli = Cli::try_parse_from([
            "zbmgr",
            "build",
            "remote",
            "D0",
            "--dest",
            "0013a20040a1b2c3",
            "--int",
            "5",
            "--frame-id",
            "7",
            "--no-escape",
        ])
        .expect("build args should parse");
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.frame_id, Some(7));
        assert!(args.no_escape);
        assert!(matches!(args.variant, BuildVariant::Remote(_)));
    }

    #[test]
    fn rejects_conflicting_parameters() {
        let err = Cli::try_parse_from(["zbmgr", "build", "at", "NI", "--int", "1", "--text", "x"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn decode_needs_input() {
        let err = Cli::try_parse_from(["zbmgr", "decode"]).expect_err("decode needs input");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}

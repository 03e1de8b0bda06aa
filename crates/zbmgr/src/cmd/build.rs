use zbmgr_frame::{
    Address16, Address64, Command, CommandName, ExplicitTransmit, FrameBuilder, FrameConfig,
    Parameter, RemoteCommand, Transmit,
};

use crate::cmd::{AddressArgs, BuildArgs, BuildVariant, LocalArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_built, OutputFormat};

pub fn run(args: BuildArgs, format: OutputFormat) -> CliResult<i32> {
    let command = command_for(&args.variant)?;
    let escaped = !args.no_escape;

    let mut builder = FrameBuilder::with_config(&FrameConfig {
        escaped,
        ..FrameConfig::default()
    });
    let frame = builder
        .build(&command, args.frame_id)
        .map_err(|err| frame_error("build failed", err))?;
    let wire = frame.encode(escaped);

    print_built(&frame, &wire, escaped, format);
    Ok(SUCCESS)
}

fn command_for(variant: &BuildVariant) -> CliResult<Command> {
    let command = match variant {
        BuildVariant::At(local) => {
            let (name, parameter) = local_parts(local)?;
            Command::local(name, parameter)
        }
        BuildVariant::Queue(local) => {
            let (name, parameter) = local_parts(local)?;
            Command::queued(name, parameter)
        }
        BuildVariant::Remote(remote) => {
            let mut request = RemoteCommand::new(command_name(&remote.command)?);
            apply_address(&remote.address, &mut request.destination, &mut request.network);
            request.options = remote.options;
            request.parameter = remote.param.parameter()?;
            Command::Remote(request)
        }
        BuildVariant::Tx(tx) => {
            let mut request = Transmit::new(tx.data.bytes()?);
            apply_address(&tx.address, &mut request.destination, &mut request.network);
            request.radius = tx.radius;
            request.options = tx.options;
            Command::Transmit(request)
        }
        BuildVariant::Explicit(tx) => {
            let mut request = ExplicitTransmit::new(tx.data.bytes()?);
            apply_address(&tx.address, &mut request.destination, &mut request.network);
            request.source_endpoint = tx.source_endpoint;
            request.destination_endpoint = tx.destination_endpoint;
            request.cluster = tx.cluster;
            request.profile = tx.profile;
            request.radius = tx.radius;
            request.options = tx.options;
            Command::ExplicitTransmit(request)
        }
    };
    Ok(command)
}

fn local_parts(local: &LocalArgs) -> CliResult<(CommandName, Option<Parameter>)> {
    Ok((command_name(&local.command)?, local.param.parameter()?))
}

fn command_name(name: &str) -> CliResult<CommandName> {
    CommandName::new(name).map_err(|err| frame_error("invalid command", err))
}

fn apply_address(args: &AddressArgs, destination: &mut Address64, network: &mut Address16) {
    if let Some(dest) = args.dest {
        *destination = dest;
    }
    if let Some(net) = args.network {
        *network = net;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ParamArgs;

    fn local(command: &str) -> LocalArgs {
        LocalArgs {
            command: command.to_string(),
            param: ParamArgs {
                int: None,
                width: None,
                text: None,
                hex: None,
            },
        }
    }

    #[test]
    fn local_command_without_parameter() {
        let command = command_for(&BuildVariant::At(local("ND"))).unwrap();
        let frame = FrameBuilder::new().build(&command, Some(1)).unwrap();
        assert_eq!(
            frame.encode(false).as_ref(),
            &[0x7E, 0x00, 0x04, 0x08, 0x01, 0x4E, 0x44, 0x64]
        );
    }

    #[test]
    fn queued_command_carries_parameter() {
        let mut args = local("NI");
        args.param.text = Some("hub".to_string());
        let command = command_for(&BuildVariant::Queue(args)).unwrap();
        assert_eq!(command.frame_type(), 0x09);

        let frame = FrameBuilder::new().build(&command, Some(2)).unwrap();
        assert_eq!(&frame.payload()[2..], b"NIhub");
    }

    #[test]
    fn invalid_command_name() {
        let err = command_for(&BuildVariant::At(local("N"))).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}

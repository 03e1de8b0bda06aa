use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{Map, Value};
use zbmgr_frame::{frame_type_name, hexdump, ApiFrame, Frame};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    seq: u64,
    frame_type: Option<u8>,
    frame_type_name: &'static str,
    frame_id: Option<u8>,
    length: u16,
    valid: bool,
    raw: String,
    fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decode_error: Option<&'a str>,
}

/// Print one dispatched frame, numbered by `seq`.
pub fn print_frame(seq: u64, frame: &Frame, format: OutputFormat) {
    let decoded = frame.decode();
    let fields = match &decoded {
        Ok(api) => describe(api),
        Err(_) => Vec::new(),
    };
    let decode_error = decoded.as_ref().err().map(ToString::to_string);
    let name = frame.frame_type().map_or("empty", frame_type_name);

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                seq,
                frame_type: frame.frame_type(),
                frame_type_name: name,
                frame_id: frame.frame_id(),
                length: frame.length(),
                valid: frame.is_valid(),
                raw: hex_string(frame.raw()),
                fields: fields_map(&fields),
                decode_error: decode_error.as_deref(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "TYPE", "ID", "LEN", "FIELDS"])
                .add_row(vec![
                    seq.to_string(),
                    name.to_string(),
                    frame.frame_id().map_or("-".to_string(), |id| id.to_string()),
                    frame.length().to_string(),
                    decode_error.unwrap_or_else(|| fields_inline(&fields)),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            match frame.frame_id() {
                Some(id) => println!("{seq} {name} id={id} {}", fields_inline(&fields)),
                None => println!("{seq} {name} {}", fields_inline(&fields)),
            }
            println!("{frame}");
        }
        OutputFormat::Raw => print_raw(frame.raw()),
    }
}

#[derive(Serialize)]
struct ChecksumFailure {
    seq: u64,
    error: &'static str,
    expected: u8,
    actual: u8,
    raw: String,
}

/// Report a frame that completed with a bad checksum.
pub fn print_checksum_failure(seq: u64, frame: &Frame, format: OutputFormat) {
    let expected = frame.expected_checksum().unwrap_or_default();
    let actual = frame.checksum().unwrap_or_default();
    match format {
        OutputFormat::Json => {
            let out = ChecksumFailure {
                seq,
                error: "checksum",
                expected,
                actual,
                raw: hex_string(frame.raw()),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => {}
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{seq} bad checksum {actual:#04x} (expected {expected:#04x})");
            println!("{frame}");
        }
    }
}

#[derive(Serialize)]
struct BuiltOutput {
    frame_type: u8,
    frame_type_name: &'static str,
    frame_id: Option<u8>,
    length: u16,
    checksum: Option<u8>,
    escaped: bool,
    wire: String,
    fields: Map<String, Value>,
}

/// Print a frame built for transmission along with its wire encoding.
pub fn print_built(frame: &Frame, wire: &[u8], escaped: bool, format: OutputFormat) {
    let fields = frame.decode().map(|api| describe(&api)).unwrap_or_default();
    let frame_type = frame.frame_type().unwrap_or_default();
    let name = frame_type_name(frame_type);

    match format {
        OutputFormat::Json => {
            let out = BuiltOutput {
                frame_type,
                frame_type_name: name,
                frame_id: frame.frame_id(),
                length: frame.length(),
                checksum: frame.checksum(),
                escaped,
                wire: hex_string(wire),
                fields: fields_map(&fields),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["type".to_string(), format!("{name} ({frame_type:#04x})")]);
            for (key, value) in &fields {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            table.add_row(vec!["wire".to_string(), hex_string(wire)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{name} {}", fields_inline(&fields));
            println!("{}", hexdump(wire, 16, Some("wire")));
        }
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Field name / rendered value pairs for a decoded frame, in wire order.
pub fn describe(api: &ApiFrame) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    match api {
        ApiFrame::LocalCommand {
            command, parameter, ..
        }
        | ApiFrame::QueuedLocalCommand {
            command, parameter, ..
        } => {
            fields.push(("command", text_or_hex(command)));
            push_bytes(&mut fields, "parameter", parameter);
        }
        ApiFrame::RemoteCommand {
            destination,
            network,
            options,
            command,
            parameter,
            ..
        } => {
            fields.push(("destination", destination.to_string()));
            fields.push(("network", network.to_string()));
            fields.push(("options", format!("{options:#04x}")));
            fields.push(("command", text_or_hex(command)));
            push_bytes(&mut fields, "parameter", parameter);
        }
        ApiFrame::Transmit {
            destination,
            network,
            radius,
            options,
            data,
            ..
        } => {
            fields.push(("destination", destination.to_string()));
            fields.push(("network", network.to_string()));
            fields.push(("radius", radius.to_string()));
            fields.push(("options", format!("{options:#04x}")));
            push_bytes(&mut fields, "data", data);
        }
        ApiFrame::ExplicitTransmit {
            destination,
            network,
            source_endpoint,
            destination_endpoint,
            cluster,
            profile,
            radius,
            options,
            data,
            ..
        } => {
            fields.push(("destination", destination.to_string()));
            fields.push(("network", network.to_string()));
            fields.push(("source_endpoint", format!("{source_endpoint:#04x}")));
            fields.push(("destination_endpoint", format!("{destination_endpoint:#04x}")));
            fields.push(("cluster", format!("{cluster:#06x}")));
            fields.push(("profile", format!("{profile:#06x}")));
            fields.push(("radius", radius.to_string()));
            fields.push(("options", format!("{options:#04x}")));
            push_bytes(&mut fields, "data", data);
        }
        ApiFrame::LocalCommandResponse {
            command,
            status,
            data,
            ..
        } => {
            fields.push(("command", text_or_hex(command)));
            fields.push(("status", status.to_string()));
            push_bytes(&mut fields, "data", data);
        }
        ApiFrame::ModemStatus { status } => fields.push(("status", format!("{status:#04x}"))),
        ApiFrame::TransmitStatus {
            network,
            retry_count,
            delivery_status,
            discovery_status,
            ..
        } => {
            fields.push(("network", network.to_string()));
            fields.push(("retries", retry_count.to_string()));
            fields.push(("delivery", format!("{delivery_status:#04x}")));
            fields.push(("discovery", format!("{discovery_status:#04x}")));
        }
        ApiFrame::ReceivePacket {
            source,
            network,
            options,
            data,
        } => {
            fields.push(("source", source.to_string()));
            fields.push(("network", network.to_string()));
            fields.push(("options", format!("{options:#04x}")));
            push_bytes(&mut fields, "data", data);
        }
        ApiFrame::RemoteCommandResponse {
            source,
            network,
            command,
            status,
            data,
            ..
        } => {
            fields.push(("source", source.to_string()));
            fields.push(("network", network.to_string()));
            fields.push(("command", text_or_hex(command)));
            fields.push(("status", status.to_string()));
            push_bytes(&mut fields, "data", data);
        }
        ApiFrame::Unrecognized { body, .. } => push_bytes(&mut fields, "body", body),
    }
    fields
}

fn push_bytes(fields: &mut Vec<(&'static str, String)>, key: &'static str, data: &[u8]) {
    if !data.is_empty() {
        fields.push((key, text_or_hex(data)));
    }
}

fn fields_map(fields: &[(&'static str, String)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
        .collect()
}

fn fields_inline(fields: &[(&'static str, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Printable ASCII as text, anything else as hex.
fn text_or_hex(data: &[u8]) -> String {
    if !data.is_empty() && data.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        String::from_utf8_lossy(data).into_owned()
    } else {
        hex_string(data)
    }
}

pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

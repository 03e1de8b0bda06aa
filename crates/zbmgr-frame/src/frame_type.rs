//! API frame type registry.
//!
//! Types below 0x80 are requests sent to the radio; types from 0x80 up are
//! responses and unsolicited indications coming from it.

/// Run a command on the local radio.
pub const LOCAL_COMMAND: u8 = 0x08;
/// Queue a parameter change on the local radio until it is applied.
pub const LOCAL_COMMAND_QUEUED: u8 = 0x09;
/// Transmit data to a remote node.
pub const TRANSMIT: u8 = 0x10;
/// Transmit with explicit endpoints, cluster and profile.
pub const EXPLICIT_TRANSMIT: u8 = 0x11;
/// Run a command on a remote radio.
pub const REMOTE_COMMAND: u8 = 0x17;
/// Install a source route.
pub const CREATE_SOURCE_ROUTE: u8 = 0x21;
/// Response to a local command.
pub const LOCAL_COMMAND_RESPONSE: u8 = 0x88;
/// Radio status change.
pub const MODEM_STATUS: u8 = 0x8A;
/// Delivery status of a transmit request.
pub const TRANSMIT_STATUS: u8 = 0x8B;
/// Data received from a remote node.
pub const RECEIVE_PACKET: u8 = 0x90;
/// Data received with explicit addressing.
pub const RECEIVE_INDICATOR: u8 = 0x91;
/// IO sample from a remote node.
pub const IO_SAMPLE: u8 = 0x92;
/// Sensor reading from a remote node.
pub const SENSOR_READ: u8 = 0x94;
/// A node announced itself.
pub const NODE_IDENTIFICATION: u8 = 0x95;
/// Response to a remote command.
pub const REMOTE_COMMAND_RESPONSE: u8 = 0x97;
/// Over-the-air firmware update status.
pub const FIRMWARE_UPDATE_STATUS: u8 = 0xA0;
/// Route taken by a received packet.
pub const ROUTE_RECORD_INDICATOR: u8 = 0xA1;
/// Many-to-one route request seen.
pub const ROUTE_REQUEST_INDICATOR: u8 = 0xA3;

/// Returns a human-readable name for a frame type.
pub fn frame_type_name(frame_type: u8) -> &'static str {
    match frame_type {
        LOCAL_COMMAND => "local-command",
        LOCAL_COMMAND_QUEUED => "local-command-queued",
        TRANSMIT => "transmit",
        EXPLICIT_TRANSMIT => "explicit-transmit",
        REMOTE_COMMAND => "remote-command",
        CREATE_SOURCE_ROUTE => "create-source-route",
        LOCAL_COMMAND_RESPONSE => "local-command-response",
        MODEM_STATUS => "modem-status",
        TRANSMIT_STATUS => "transmit-status",
        RECEIVE_PACKET => "receive-packet",
        RECEIVE_INDICATOR => "receive-indicator",
        IO_SAMPLE => "io-sample",
        SENSOR_READ => "sensor-read",
        NODE_IDENTIFICATION => "node-identification",
        REMOTE_COMMAND_RESPONSE => "remote-command-response",
        FIRMWARE_UPDATE_STATUS => "firmware-update-status",
        ROUTE_RECORD_INDICATOR => "route-record-indicator",
        ROUTE_REQUEST_INDICATOR => "route-request-indicator",
        _ => "unknown",
    }
}

/// Returns true if the frame type is in the registry.
pub fn is_known(frame_type: u8) -> bool {
    frame_type_name(frame_type) != "unknown"
}

/// Returns true if the byte after the frame type is a frame ID.
///
/// Unsolicited indications (receive packets, samples, status changes) start
/// their type-specific fields right after the type byte.
pub fn carries_frame_id(frame_type: u8) -> bool {
    matches!(
        frame_type,
        LOCAL_COMMAND
            | LOCAL_COMMAND_QUEUED
            | TRANSMIT
            | EXPLICIT_TRANSMIT
            | REMOTE_COMMAND
            | CREATE_SOURCE_ROUTE
            | LOCAL_COMMAND_RESPONSE
            | TRANSMIT_STATUS
            | REMOTE_COMMAND_RESPONSE
    )
}

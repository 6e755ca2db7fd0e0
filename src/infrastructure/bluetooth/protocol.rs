//! Reminder Device Protocol
//!
//! This module contains the protocol definitions for communicating with
//! the ESP32 reminder device: GATT identifiers and the time-sync commands.

use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Reminder BLE Service UUID
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// Command Characteristic UUID - where time-sync commands are written
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// Name the reminder firmware advertises
pub const DEVICE_NAME: &str = "ESP32_Feather_BLE";

/// How long a session scans before giving up
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Timestamp layout understood by the firmware
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Time-sync commands understood by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Set the device clock to the phone's current time
    SetTime,
    /// Set the moment the reminder fires
    SetTargetTime,
}

impl CommandKind {
    /// ASCII keyword that prefixes the payload
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::SetTime => "settime",
            Self::SetTargetTime => "targettime",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetTime => f.write_str("current time"),
            Self::SetTargetTime => f.write_str("target time"),
        }
    }
}

/// A command ready to be written to the characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    kind: CommandKind,
    payload: String,
}

impl EncodedCommand {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.payload
    }
}

impl fmt::Display for EncodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)
    }
}

/// Drop seconds and sub-second precision. Never rounds up.
pub fn truncate_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(timestamp)
}

/// Encode a command as `<keyword> YYYY-MM-DD HH:MM`
///
/// # Payload Structure
///
/// ```text
/// settime 2024-05-01 13:07
/// ^^^^^^^ ^^^^^^^^^^^^^^^^
/// keyword  minute-precision local timestamp, single space separator
/// ```
pub fn encode(kind: CommandKind, timestamp: NaiveDateTime) -> EncodedCommand {
    let timestamp = truncate_to_minute(timestamp);
    EncodedCommand {
        kind,
        payload: format!("{} {}", kind.keyword(), timestamp.format(TIME_FORMAT)),
    }
}

/// The fixed command sequence of one session: clock first, then target
pub fn session_commands(current: NaiveDateTime, target: NaiveDateTime) -> [EncodedCommand; 2] {
    [
        encode(CommandKind::SetTime, current),
        encode(CommandKind::SetTargetTime, target),
    ]
}

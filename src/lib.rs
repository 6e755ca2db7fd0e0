//! Tangible Reminder
//!
//! Sets a reminder on an ESP32 reminder device over Bluetooth LE: finds the
//! device by its advertised name, connects, and writes the current time and
//! the reminder time to its command characteristic.
//!
//! The session logic is platform independent and runs against any
//! [`RadioAdapter`](infrastructure::bluetooth::adapter::RadioAdapter). The
//! only radio adapter shipped is the WinRT one, so the `set` command talks
//! to real hardware on Windows only. Elsewhere it reports that the Bluetooth
//! adapter could not be initialized and exits with a failure code. A
//! btleplug adapter would cover Linux and macOS, but its Linux backend links
//! against the system D-Bus libraries at build time.

pub mod domain;
pub mod infrastructure;
pub mod presentation;

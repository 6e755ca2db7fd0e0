//! Command-line front end
//!
//! Collects the reminder inputs, runs one session and prints its status.

use crate::domain::models::{MessageSeverity, SessionEvent, SessionOutcome};
use crate::domain::reminder::Reminder;
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::adapter::RadioAdapter;
use crate::infrastructure::bluetooth::{start_session, SessionConfig};
use crate::infrastructure::logging::{init_logger, LoggingGuard};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "tangible-reminder")]
#[command(about = "Set a reminder on a Tangible Reminder device over Bluetooth LE")]
pub struct Cli {
    /// Log protocol details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the current time and the reminder time to the device
    Set {
        /// What to be reminded of
        #[arg(short, long)]
        name: String,
        /// Reminder time (HH:MM)
        #[arg(short, long, value_parser = parse_time)]
        time: NaiveTime,
        /// Reminder date (YYYY-MM-DD), defaults to today
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Advertised device name, overrides the settings file
        #[arg(long)]
        device: Option<String>,
        /// Scan timeout in seconds, overrides the settings file
        #[arg(long)]
        scan_timeout: Option<u64>,
    },
    /// Show the settings file, updating any value given
    Settings {
        /// Advertised device name to store
        #[arg(long)]
        device: Option<String>,
        /// Scan timeout in seconds to store
        #[arg(long)]
        scan_timeout: Option<u64>,
        /// Connect timeout in seconds to store
        #[arg(long)]
        connect_timeout: Option<u64>,
    },
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| format!("expected HH:MM ({})", e))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD ({})", e))
}

/// Apply the values given on the command line; true if anything changed
fn update_settings(
    settings_service: &mut SettingsService,
    device: Option<String>,
    scan_timeout: Option<u64>,
    connect_timeout: Option<u64>,
) -> anyhow::Result<bool> {
    if device.is_none() && scan_timeout.is_none() && connect_timeout.is_none() {
        return Ok(false);
    }

    let settings = settings_service.get_mut();
    if let Some(device) = device {
        if device.trim().is_empty() {
            anyhow::bail!("device name must not be blank");
        }
        settings.device_name = device;
    }
    if let Some(secs) = scan_timeout {
        settings.scan_timeout_secs = secs;
    }
    if let Some(secs) = connect_timeout {
        settings.connect_timeout_secs = secs;
    }
    settings_service.save()?;
    info!("Settings saved to {}", settings_service.path().display());
    Ok(true)
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings_service = SettingsService::new()?;

    let mut log_settings = settings_service.get().log_settings.clone();
    if cli.verbose {
        log_settings.level = "debug".to_string();
    }
    let _logging_guard: Option<LoggingGuard> = init_logger(&log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    match cli.command {
        Commands::Settings {
            device,
            scan_timeout,
            connect_timeout,
        } => {
            if let Err(e) =
                update_settings(&mut settings_service, device, scan_timeout, connect_timeout)
            {
                println!("Could not save settings: {}", e);
                return Ok(ExitCode::FAILURE);
            }
            println!("Settings file: {}", settings_service.path().display());
            println!("{}", serde_json::to_string_pretty(settings_service.get())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Set {
            name,
            time,
            date,
            device,
            scan_timeout,
        } => {
            let settings = settings_service.get();
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let reminder = match Reminder::new(&name, date, time) {
                Ok(reminder) => reminder,
                Err(e) => {
                    println!("{}", e);
                    return Ok(ExitCode::FAILURE);
                }
            };

            let device_name = device.unwrap_or_else(|| settings.device_name.clone());
            let mut config = settings.session_config();
            if let Some(secs) = scan_timeout {
                config.scan_timeout = Duration::from_secs(secs);
            }

            set_on_platform_adapter(&reminder, &device_name, config).await
        }
    }
}

#[cfg(windows)]
async fn set_on_platform_adapter(
    reminder: &Reminder,
    device_name: &str,
    config: SessionConfig,
) -> anyhow::Result<ExitCode> {
    use crate::infrastructure::bluetooth::winrt::WinRtAdapter;

    match WinRtAdapter::new().await {
        Ok(adapter) => Ok(exit_code(
            &set_reminder(&adapter, reminder, device_name, config).await,
        )),
        Err(e) => {
            error!("Failed to open Bluetooth radio: {}", e);
            println!("Bluetooth adapter initialization failed.");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(not(windows))]
async fn set_on_platform_adapter(
    _reminder: &Reminder,
    _device_name: &str,
    _config: SessionConfig,
) -> anyhow::Result<ExitCode> {
    error!("No radio adapter implementation for this platform");
    println!("Bluetooth adapter initialization failed.");
    Ok(ExitCode::FAILURE)
}

#[cfg(windows)]
fn exit_code(outcome: &SessionOutcome) -> ExitCode {
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run one session for `reminder` and print its progress and result
pub async fn set_reminder<A: RadioAdapter>(
    adapter: &A,
    reminder: &Reminder,
    device_name: &str,
    config: SessionConfig,
) -> SessionOutcome {
    let (tx, rx) = mpsc::unbounded_channel();
    let current_time = Local::now().naive_local();

    let (outcome, ()) = tokio::join!(
        start_session(
            adapter,
            config,
            tx,
            device_name,
            current_time,
            reminder.target()
        ),
        print_events(rx)
    );

    if outcome.is_success() {
        println!("{}", reminder.confirmation());
    }
    outcome
}

/// Print status messages until the session drops its sender
async fn print_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::StateChanged(state) => debug!("State: {:?}", state),
            SessionEvent::LogMessage(msg) => match msg.severity {
                MessageSeverity::Error => println!("Error: {}", msg.message),
                MessageSeverity::Warning => println!("Warning: {}", msg.message),
                MessageSeverity::Info | MessageSeverity::Success => println!("{}", msg.message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::fake::FakeAdapter;

    #[test]
    fn test_parse_inputs() {
        assert_eq!(
            parse_time("07:45"),
            Ok(NaiveTime::from_hms_opt(7, 45, 0).unwrap())
        );
        assert!(parse_time("7pm").is_err());
        assert_eq!(
            parse_date("2024-05-01"),
            Ok(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
        assert!(parse_date("01/05/2024").is_err());
    }

    #[test]
    fn test_cli_parses_set() {
        let cli = Cli::try_parse_from([
            "tangible-reminder",
            "set",
            "--name",
            "Water plants",
            "--time",
            "18:30",
            "--date",
            "2024-06-01",
        ])
        .unwrap();
        match cli.command {
            Commands::Set { name, time, date, .. } => {
                assert_eq!(name, "Water plants");
                assert_eq!(time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 1));
            }
            Commands::Settings { .. } => panic!("expected set"),
        }
    }

    #[test]
    fn test_cli_parses_settings_flags() {
        let cli = Cli::try_parse_from([
            "tangible-reminder",
            "settings",
            "--device",
            "Desk_Reminder",
            "--connect-timeout",
            "20",
        ])
        .unwrap();
        match cli.command {
            Commands::Settings {
                device,
                scan_timeout,
                connect_timeout,
            } => {
                assert_eq!(device.as_deref(), Some("Desk_Reminder"));
                assert_eq!(scan_timeout, None);
                assert_eq!(connect_timeout, Some(20));
            }
            Commands::Set { .. } => panic!("expected settings"),
        }
    }

    #[test]
    fn test_update_settings_persists() {
        let dir = std::env::temp_dir().join(format!(
            "tangible_reminder_cli_settings_{}",
            std::process::id()
        ));
        let path = dir.join("settings.json");
        let mut service = SettingsService::from_path(path.clone());

        assert!(!update_settings(&mut service, None, None, None).unwrap());
        assert!(!path.exists());

        assert!(update_settings(
            &mut service,
            Some("Desk_Reminder".to_string()),
            Some(45),
            None
        )
        .unwrap());
        assert!(update_settings(&mut service, Some("  ".to_string()), None, None).is_err());

        let reloaded = SettingsService::from_path(path);
        assert_eq!(reloaded.get().device_name, "Desk_Reminder");
        assert_eq!(reloaded.get().scan_timeout_secs, 45);
        assert_eq!(reloaded.get().connect_timeout_secs, 15);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_no_platform_adapter_fails() {
        let reminder = Reminder::new(
            "Water plants",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
        )
        .unwrap();

        let code =
            set_on_platform_adapter(&reminder, "ESP32_Feather_BLE", SessionConfig::default())
                .await
                .unwrap();

        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_reminder_writes_target() {
        let adapter =
            FakeAdapter::new().advertise("ESP32_Feather_BLE", "esp", Duration::from_secs(2));
        let reminder = Reminder::new(
            "Water plants",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
        )
        .unwrap();

        let outcome = set_reminder(
            &adapter,
            &reminder,
            "ESP32_Feather_BLE",
            SessionConfig::default(),
        )
        .await;

        assert_eq!(outcome, SessionOutcome::Success);
        let writes = adapter.writes();
        assert!(writes[0].starts_with("settime "));
        assert_eq!(writes[1], "targettime 2024-06-01 18:30");
    }
}

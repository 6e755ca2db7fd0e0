use crate::infrastructure::bluetooth::protocol::CommandKind;
use thiserror::Error;

/// Stages of one session, strictly forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    ResolvingService,
    ResolvingCharacteristic,
    Dispatching,
    Done(SessionOutcome),
}

impl SessionState {
    /// Position in the forward order; every `Done` shares the last slot
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Scanning => 1,
            Self::Connecting => 2,
            Self::ResolvingService => 3,
            Self::ResolvingCharacteristic => 4,
            Self::Dispatching => 5,
            Self::Done(_) => 6,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Why a session ended without setting the reminder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFailure {
    #[error("Please enter a device name.")]
    InvalidInput,
    #[error("Bluetooth permission not granted.")]
    PermissionDenied,
    #[error("Device not found.")]
    DeviceNotFound,
    #[error("Could not connect to the device.")]
    ConnectFailed,
    #[error("Service not found.")]
    ServiceMissing,
    #[error("Characteristic not found.")]
    CharacteristicMissing,
    #[error("Failed to send the {kind}.")]
    WriteFailed { index: usize, kind: CommandKind },
}

/// Terminal value of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Success,
    Failure(SessionFailure),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// One-line status shown to the user
    pub fn status(&self) -> String {
        match self {
            Self::Success => "Reminder set!".to_string(),
            Self::Failure(failure) => failure.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

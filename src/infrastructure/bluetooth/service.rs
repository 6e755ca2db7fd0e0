//! Reminder Session Service
//!
//! Coordinates scanning, connection and command dispatch for one
//! time-sync session and reduces whatever happens to a single
//! [`SessionOutcome`].

use crate::domain::models::{
    MessageSeverity, SessionEvent, SessionFailure, SessionOutcome, SessionState, StatusMessage,
};
use crate::infrastructure::bluetooth::{
    adapter::RadioAdapter,
    connection::{BleConnection, ConnectionConfig, EstablishError},
    dispatcher::CommandDispatcher,
    protocol::{self, session_commands},
    scanner::{BleScanner, ScanOutcome},
};
use chrono::NaiveDateTime;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Per-session tunables
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub scan_timeout: Duration,
    pub connection: ConnectionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_timeout: protocol::SCAN_TIMEOUT,
            connection: ConnectionConfig::default(),
        }
    }
}

impl From<EstablishError> for SessionFailure {
    fn from(err: EstablishError) -> Self {
        match err {
            EstablishError::ConnectFailed => Self::ConnectFailed,
            EstablishError::ServiceMissing(_) => Self::ServiceMissing,
            EstablishError::CharacteristicMissing(_) => Self::CharacteristicMissing,
        }
    }
}

/// Run one session against `adapter` on a fresh state machine
pub async fn start_session<A: RadioAdapter>(
    adapter: &A,
    config: SessionConfig,
    event_sender: mpsc::UnboundedSender<SessionEvent>,
    device_name: &str,
    current_time: NaiveDateTime,
    target_time: NaiveDateTime,
) -> SessionOutcome {
    SessionOrchestrator::new(adapter, config, event_sender)
        .run(device_name, current_time, target_time)
        .await
}

/// State machine for a single discover → connect → write attempt
///
/// Consumed by [`run`](Self::run); a new session needs a new orchestrator.
pub struct SessionOrchestrator<'a, A: RadioAdapter> {
    adapter: &'a A,
    config: SessionConfig,
    state: SessionState,
    event_sender: mpsc::UnboundedSender<SessionEvent>,
}

impl<'a, A: RadioAdapter> SessionOrchestrator<'a, A> {
    pub fn new(
        adapter: &'a A,
        config: SessionConfig,
        event_sender: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            adapter,
            config,
            state: SessionState::Idle,
            event_sender,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn run(
        mut self,
        device_name: &str,
        current_time: NaiveDateTime,
        target_time: NaiveDateTime,
    ) -> SessionOutcome {
        let outcome = self.drive(device_name, current_time, target_time).await;

        match &outcome {
            SessionOutcome::Success => {
                info!("Session finished: reminder set");
                self.send_log(&outcome.status(), MessageSeverity::Success);
            }
            SessionOutcome::Failure(failure) => {
                warn!("Session failed: {:?}", failure);
                self.send_log(&outcome.status(), MessageSeverity::Error);
            }
        }
        self.transition(SessionState::Done(outcome.clone()));
        outcome
    }

    async fn drive(
        &mut self,
        device_name: &str,
        current_time: NaiveDateTime,
        target_time: NaiveDateTime,
    ) -> SessionOutcome {
        if device_name.trim().is_empty() {
            return SessionOutcome::Failure(SessionFailure::InvalidInput);
        }

        self.send_log("Requesting permissions...", MessageSeverity::Info);
        if !self.adapter.has_radio_permission().await {
            return SessionOutcome::Failure(SessionFailure::PermissionDenied);
        }

        self.transition(SessionState::Scanning);
        self.send_log(
            &format!("Scanning for {}...", device_name),
            MessageSeverity::Info,
        );
        let scanner = BleScanner::new(self.adapter);
        let peripheral = match scanner.find(device_name, self.config.scan_timeout).await {
            Ok(ScanOutcome::Found(peripheral)) => peripheral,
            Ok(ScanOutcome::NotFound) => {
                return SessionOutcome::Failure(SessionFailure::DeviceNotFound)
            }
            Err(e) => {
                warn!("Scan aborted: {}", e);
                self.send_log("Scan was interrupted.", MessageSeverity::Warning);
                return SessionOutcome::Failure(SessionFailure::DeviceNotFound);
            }
        };

        self.transition(SessionState::Connecting);
        self.send_log("Connecting...", MessageSeverity::Info);
        let connection = BleConnection::new(self.adapter, self.config.connection.clone());
        let outcome = match connection.connect(&peripheral).await {
            Ok(()) => {
                self.exchange(&connection, &peripheral, current_time, target_time)
                    .await
            }
            Err(e) => SessionOutcome::Failure(e.into()),
        };

        self.release(&peripheral).await;
        outcome
    }

    /// Resolve the characteristic on a connected device and write both times
    async fn exchange(
        &mut self,
        connection: &BleConnection<'a, A>,
        peripheral: &A::Peripheral,
        current_time: NaiveDateTime,
        target_time: NaiveDateTime,
    ) -> SessionOutcome {
        self.transition(SessionState::ResolvingService);
        let service = match connection.resolve_service(peripheral).await {
            Ok(service) => service,
            Err(e) => return SessionOutcome::Failure(e.into()),
        };

        self.transition(SessionState::ResolvingCharacteristic);
        let characteristic = match connection.resolve_characteristic(&service).await {
            Ok(characteristic) => characteristic,
            Err(e) => return SessionOutcome::Failure(e.into()),
        };

        self.transition(SessionState::Dispatching);
        self.send_log("Sending times...", MessageSeverity::Info);
        let commands = session_commands(current_time, target_time);
        match CommandDispatcher::new(self.adapter)
            .send(&characteristic, &commands)
            .await
        {
            Ok(()) => SessionOutcome::Success,
            Err(e) => SessionOutcome::Failure(SessionFailure::WriteFailed {
                index: e.index,
                kind: e.kind,
            }),
        }
    }

    /// Drop the connection so the radio is free for the next session
    async fn release(&self, peripheral: &A::Peripheral) {
        match self.adapter.disconnect(peripheral).await {
            Ok(()) => info!("Disconnected from device"),
            Err(e) => {
                warn!("Disconnect failed: {}", e);
                self.send_log("Could not disconnect cleanly.", MessageSeverity::Warning);
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            !self.state.is_terminal(),
            "session already finished: {:?}",
            self.state
        );
        debug_assert!(
            next.ordinal() > self.state.ordinal(),
            "session state moved backwards: {:?} -> {:?}",
            self.state,
            next
        );
        info!("Session state: {:?} -> {:?}", self.state, next);
        self.state = next;
        let _ = self
            .event_sender
            .send(SessionEvent::StateChanged(self.state.clone()));
    }

    /// Send a log message
    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(SessionEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}

//! BLE Connection Module
//!
//! Connects to a discovered peripheral and resolves the GATT service and
//! characteristic the session writes to. One attempt per call.

use crate::infrastructure::bluetooth::adapter::{AdapterError, RadioAdapter};
use crate::infrastructure::bluetooth::protocol::{CHARACTERISTIC_UUID, SERVICE_UUID};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound on a single connection attempt
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstablishError {
    #[error("connection failed")]
    ConnectFailed,
    #[error("service {0} not found")]
    ServiceMissing(Uuid),
    #[error("characteristic {0} not found")]
    CharacteristicMissing(Uuid),
}

/// BLE Connection handler
pub struct BleConnection<'a, A: RadioAdapter> {
    adapter: &'a A,
    config: ConnectionConfig,
}

impl<'a, A: RadioAdapter> BleConnection<'a, A> {
    pub fn new(adapter: &'a A, config: ConnectionConfig) -> Self {
        Self { adapter, config }
    }

    /// Connect, then resolve the configured service and characteristic
    pub async fn connect_and_resolve(
        &self,
        peripheral: &A::Peripheral,
    ) -> Result<A::Characteristic, EstablishError> {
        self.connect(peripheral).await?;
        let service = self.resolve_service(peripheral).await?;
        self.resolve_characteristic(&service).await
    }

    /// Step 1: connect to the peripheral
    pub async fn connect(&self, peripheral: &A::Peripheral) -> Result<(), EstablishError> {
        info!("Connecting to Bluetooth device: {:?}", peripheral);

        match tokio::time::timeout(self.config.connect_timeout, self.adapter.connect(peripheral))
            .await
        {
            Ok(Ok(())) => {
                info!("Device connected");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Failed to connect: {}", e);
                Err(EstablishError::ConnectFailed)
            }
            Err(_) => {
                error!(
                    "Connection attempt timed out after {}s",
                    self.config.connect_timeout.as_secs()
                );
                Err(EstablishError::ConnectFailed)
            }
        }
    }

    /// Step 2: look up the reminder service on the connected device
    ///
    /// A link that drops here never got the device talking, so it counts
    /// as a failed connection rather than a missing service.
    pub async fn resolve_service(
        &self,
        peripheral: &A::Peripheral,
    ) -> Result<A::Service, EstablishError> {
        let uuid = SERVICE_UUID;
        match self.adapter.get_service(peripheral, uuid).await {
            Ok(Some(service)) => {
                info!("Found reminder service");
                Ok(service)
            }
            Ok(None) => {
                warn!("Service {} not present on device", uuid);
                Err(EstablishError::ServiceMissing(uuid))
            }
            Err(AdapterError::Unreachable(reason)) => {
                error!("Device unreachable during service discovery: {}", reason);
                Err(EstablishError::ConnectFailed)
            }
            Err(e) => {
                error!("Failed to get GATT services: {}", e);
                Err(EstablishError::ServiceMissing(uuid))
            }
        }
    }

    /// Step 3: look up the command characteristic on that service
    pub async fn resolve_characteristic(
        &self,
        service: &A::Service,
    ) -> Result<A::Characteristic, EstablishError> {
        let uuid = CHARACTERISTIC_UUID;
        match self.adapter.get_characteristic(service, uuid).await {
            Ok(Some(characteristic)) => {
                info!("Found command characteristic");
                Ok(characteristic)
            }
            Ok(None) => {
                warn!("Characteristic {} not present on service", uuid);
                Err(EstablishError::CharacteristicMissing(uuid))
            }
            Err(e) => {
                error!("Failed to get characteristics: {}", e);
                Err(EstablishError::CharacteristicMissing(uuid))
            }
        }
    }
}

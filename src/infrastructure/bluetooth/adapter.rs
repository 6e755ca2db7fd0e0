//! Radio Adapter Capability
//!
//! The platform BLE stack as seen by the session. Implementations own the
//! radio; the session only borrows it for the duration of one attempt.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Faults raised by a radio adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no Bluetooth radio adapter available: {0}")]
    Unavailable(String),
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("connection failed: {0}")]
    Connect(String),
    /// The link to the device dropped or could not be opened
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("GATT request failed: {0}")]
    Gatt(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("adapter is already scanning")]
    AlreadyScanning,
    #[error("not connected to the device")]
    NotConnected,
}

/// A single advertisement seen during a scan
#[derive(Debug, Clone)]
pub struct Advertisement<P> {
    /// Advertised local name, if the packet carried one
    pub name: Option<String>,
    pub peripheral: P,
}

/// Discovery stream handed out by [`RadioAdapter::start_scan`]
pub type AdvertisementStream<P> = mpsc::UnboundedReceiver<Advertisement<P>>;

/// Outbound capability to the platform BLE stack
///
/// One session at a time talks to an adapter. Scanning start/stop are
/// synchronous so a drop guard can always stop the radio.
#[async_trait(?Send)]
pub trait RadioAdapter {
    /// Handle to a discovered device, valid until disconnect
    type Peripheral: Clone + std::fmt::Debug;
    type Service;
    type Characteristic;

    /// Whether the process may use the radio at all
    async fn has_radio_permission(&self) -> bool;

    fn start_scan(&self) -> Result<AdvertisementStream<Self::Peripheral>, AdapterError>;

    fn stop_scan(&self) -> Result<(), AdapterError>;

    async fn connect(&self, peripheral: &Self::Peripheral) -> Result<(), AdapterError>;

    async fn get_service(
        &self,
        peripheral: &Self::Peripheral,
        service_id: Uuid,
    ) -> Result<Option<Self::Service>, AdapterError>;

    async fn get_characteristic(
        &self,
        service: &Self::Service,
        characteristic_id: Uuid,
    ) -> Result<Option<Self::Characteristic>, AdapterError>;

    /// Write with response; resolves once the device acknowledged
    async fn write(
        &self,
        characteristic: &Self::Characteristic,
        payload: &[u8],
    ) -> Result<(), AdapterError>;

    async fn disconnect(&self, peripheral: &Self::Peripheral) -> Result<(), AdapterError>;
}

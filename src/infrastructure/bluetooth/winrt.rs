//! WinRT Radio Adapter
//!
//! Windows implementation of [`RadioAdapter`] on top of the
//! `Windows.Devices.Bluetooth` APIs.

use crate::infrastructure::bluetooth::adapter::{
    AdapterError, Advertisement, AdvertisementStream, RadioAdapter,
};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use windows::core::GUID;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus, GattDeviceService, GattSession, GattWriteOption,
};
use windows::Devices::Bluetooth::{BluetoothAdapter, BluetoothCacheMode, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataWriter;

fn to_guid(uuid: Uuid) -> GUID {
    GUID::from_u128(uuid.as_u128())
}

/// Map a GATT query status to an adapter fault, `Unreachable` kept apart
fn check_status(status: GattCommunicationStatus, what: &str) -> Result<(), AdapterError> {
    if status == GattCommunicationStatus::Success {
        Ok(())
    } else if status == GattCommunicationStatus::Unreachable {
        Err(AdapterError::Unreachable(format!("{} query", what)))
    } else {
        Err(AdapterError::Gatt(format!("{} query status {:?}", what, status)))
    }
}

struct ActiveScan {
    watcher: BluetoothLEAdvertisementWatcher,
    token: i64,
}

/// Radio adapter backed by the default Windows Bluetooth radio
pub struct WinRtAdapter {
    scan: Mutex<Option<ActiveScan>>,
    device: Mutex<Option<BluetoothLEDevice>>,
    session: Mutex<Option<GattSession>>,
}

impl WinRtAdapter {
    /// Open the default radio; fails when there is none or it lacks LE
    pub async fn new() -> Result<Self, AdapterError> {
        let radio = BluetoothAdapter::GetDefaultAsync()
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?
            .await
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;

        let le_supported = radio
            .IsLowEnergySupported()
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        if !le_supported {
            return Err(AdapterError::Unavailable(
                "Bluetooth LE is not supported by this radio".to_string(),
            ));
        }

        info!("Using Bluetooth radio {:#X}", radio.BluetoothAddress().unwrap_or_default());
        Ok(Self {
            scan: Mutex::new(None),
            device: Mutex::new(None),
            session: Mutex::new(None),
        })
    }

    fn current_device(&self) -> Result<BluetoothLEDevice, AdapterError> {
        self.device
            .lock()
            .map_err(|_| AdapterError::Gatt("Lock error".to_string()))?
            .clone()
            .ok_or(AdapterError::NotConnected)
    }
}

#[async_trait(?Send)]
impl RadioAdapter for WinRtAdapter {
    type Peripheral = u64;
    type Service = GattDeviceService;
    type Characteristic = GattCharacteristic;

    async fn has_radio_permission(&self) -> bool {
        // Desktop apps need no runtime consent for BLE.
        true
    }

    fn start_scan(&self) -> Result<AdvertisementStream<u64>, AdapterError> {
        let scan_err = |e: windows::core::Error| AdapterError::Scan(e.to_string());

        let mut slot = self
            .scan
            .lock()
            .map_err(|_| AdapterError::Scan("Lock error".to_string()))?;
        if slot.is_some() {
            return Err(AdapterError::AlreadyScanning);
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = BluetoothLEAdvertisementWatcher::new().map_err(scan_err)?;
        watcher
            .SetScanningMode(BluetoothLEScanningMode::Active)
            .map_err(scan_err)?;

        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let name = args.Advertisement()?.LocalName()?.to_string();
                    let address = args.BluetoothAddress()?;
                    let _ = tx.send(Advertisement {
                        name: (!name.is_empty()).then_some(name),
                        peripheral: address,
                    });
                }
                Ok(())
            },
        );

        let token = watcher.Received(&handler).map_err(scan_err)?;
        watcher.Start().map_err(scan_err)?;
        debug!("Advertisement watcher started");

        *slot = Some(ActiveScan { watcher, token });
        Ok(rx)
    }

    fn stop_scan(&self) -> Result<(), AdapterError> {
        let active = self
            .scan
            .lock()
            .map_err(|_| AdapterError::Scan("Lock error".to_string()))?
            .take();

        if let Some(ActiveScan { watcher, token }) = active {
            watcher
                .Stop()
                .map_err(|e| AdapterError::Scan(e.to_string()))?;
            watcher
                .RemoveReceived(token)
                .map_err(|e| AdapterError::Scan(e.to_string()))?;
            debug!("Advertisement watcher stopped");
        }
        Ok(())
    }

    async fn connect(&self, peripheral: &u64) -> Result<(), AdapterError> {
        let connect_err = |e: windows::core::Error| AdapterError::Connect(e.to_string());

        // Opening the device object does not touch the radio link.
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(*peripheral)
            .map_err(connect_err)?
            .await
            .map_err(connect_err)?;

        let device_id = device.BluetoothDeviceId().map_err(connect_err)?;
        let session = GattSession::FromDeviceIdAsync(&device_id)
            .map_err(connect_err)?
            .await
            .map_err(connect_err)?;
        session.SetMaintainConnection(true).map_err(connect_err)?;
        info!("GattSession created, MaintainConnection set to true");

        // An uncached query only completes once the link is really up.
        let result = device
            .GetGattServicesWithCacheModeAsync(BluetoothCacheMode::Uncached)
            .map_err(connect_err)?
            .await
            .map_err(connect_err)?;
        let status = result.Status().map_err(connect_err)?;
        if status != GattCommunicationStatus::Success {
            let _ = session.Close();
            let _ = device.Close();
            return Err(AdapterError::Connect(format!(
                "link not established, status {:?}",
                status
            )));
        }
        info!("Device connected: {:?}", device.Name().map(|n| n.to_string()));

        *self
            .device
            .lock()
            .map_err(|_| AdapterError::Connect("Lock error".to_string()))? = Some(device);
        *self
            .session
            .lock()
            .map_err(|_| AdapterError::Connect("Lock error".to_string()))? = Some(session);
        Ok(())
    }

    async fn get_service(
        &self,
        _peripheral: &u64,
        service_id: Uuid,
    ) -> Result<Option<GattDeviceService>, AdapterError> {
        let gatt_err = |e: windows::core::Error| AdapterError::Gatt(e.to_string());
        let device = self.current_device()?;

        let result = device
            .GetGattServicesForUuidAsync(to_guid(service_id))
            .map_err(gatt_err)?
            .await
            .map_err(gatt_err)?;

        check_status(result.Status().map_err(gatt_err)?, "service")?;

        let services = result.Services().map_err(gatt_err)?;
        if services.Size().map_err(gatt_err)? == 0 {
            return Ok(None);
        }
        Ok(Some(services.GetAt(0).map_err(gatt_err)?))
    }

    async fn get_characteristic(
        &self,
        service: &GattDeviceService,
        characteristic_id: Uuid,
    ) -> Result<Option<GattCharacteristic>, AdapterError> {
        let gatt_err = |e: windows::core::Error| AdapterError::Gatt(e.to_string());

        let result = service
            .GetCharacteristicsForUuidAsync(to_guid(characteristic_id))
            .map_err(gatt_err)?
            .await
            .map_err(gatt_err)?;

        check_status(result.Status().map_err(gatt_err)?, "characteristic")?;

        let characteristics = result.Characteristics().map_err(gatt_err)?;
        if characteristics.Size().map_err(gatt_err)? == 0 {
            return Ok(None);
        }
        Ok(Some(characteristics.GetAt(0).map_err(gatt_err)?))
    }

    async fn write(
        &self,
        characteristic: &GattCharacteristic,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        let write_err = |e: windows::core::Error| AdapterError::Write(e.to_string());

        let writer = DataWriter::new().map_err(write_err)?;
        writer.WriteBytes(payload).map_err(write_err)?;
        let buffer = writer.DetachBuffer().map_err(write_err)?;

        let status = characteristic
            .WriteValueWithOptionAsync(&buffer, GattWriteOption::WriteWithResponse)
            .map_err(write_err)?
            .await
            .map_err(write_err)?;

        if status != GattCommunicationStatus::Success {
            return Err(AdapterError::Write(format!("write status {:?}", status)));
        }
        Ok(())
    }

    async fn disconnect(&self, _peripheral: &u64) -> Result<(), AdapterError> {
        let session = self
            .session
            .lock()
            .map_err(|_| AdapterError::NotConnected)?
            .take();
        if let Some(session) = session {
            if let Err(e) = session.Close() {
                warn!("Failed to close GattSession: {}", e);
            }
        }

        let device = self
            .device
            .lock()
            .map_err(|_| AdapterError::NotConnected)?
            .take();

        if let Some(device) = device {
            device.Close().map_err(|e| AdapterError::Connect(e.to_string()))?;
        }
        Ok(())
    }
}

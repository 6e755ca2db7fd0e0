//! Scripted radio adapter used by the session tests.

use super::adapter::{AdapterError, Advertisement, AdvertisementStream, RadioAdapter};
use super::protocol::{CHARACTERISTIC_UUID, SERVICE_UUID};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Everything the session asked of the radio, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartScan,
    StopScan,
    Connect(String),
    GetService(Uuid),
    GetCharacteristic(Uuid),
    Write(String),
    Disconnect(String),
}

#[derive(Debug, Clone)]
struct ScriptedAdvertisement {
    after: Duration,
    name: Option<String>,
    peripheral: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeService(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeCharacteristic(pub Uuid);

pub struct FakeAdapter {
    permission: bool,
    advertisements: Vec<ScriptedAdvertisement>,
    fail_start_scan: bool,
    close_stream: bool,
    fail_connect: bool,
    hang_connect: bool,
    service_fault: Option<fn() -> AdapterError>,
    characteristic_fault: bool,
    fail_disconnect: bool,
    service: Option<Uuid>,
    characteristic: Option<Uuid>,
    failing_writes: HashSet<usize>,
    writes_issued: Mutex<usize>,
    scan_tx: Mutex<Option<mpsc::UnboundedSender<Advertisement<String>>>>,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeAdapter {
    fn default() -> Self {
        Self {
            permission: true,
            advertisements: Vec::new(),
            fail_start_scan: false,
            close_stream: false,
            fail_connect: false,
            hang_connect: false,
            service_fault: None,
            characteristic_fault: false,
            fail_disconnect: false,
            service: Some(SERVICE_UUID),
            characteristic: Some(CHARACTERISTIC_UUID),
            failing_writes: HashSet::new(),
            writes_issued: Mutex::new(0),
            scan_tx: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise `name` from peripheral `id` once `after` has elapsed
    pub fn advertise(mut self, name: &str, id: &str, after: Duration) -> Self {
        self.advertisements.push(ScriptedAdvertisement {
            after,
            name: Some(name.to_string()),
            peripheral: id.to_string(),
        });
        self
    }

    pub fn advertise_unnamed(mut self, id: &str, after: Duration) -> Self {
        self.advertisements.push(ScriptedAdvertisement {
            after,
            name: None,
            peripheral: id.to_string(),
        });
        self
    }

    pub fn without_permission(mut self) -> Self {
        self.permission = false;
        self
    }

    pub fn failing_start_scan(mut self) -> Self {
        self.fail_start_scan = true;
        self
    }

    /// Drop the discovery sender right after the scan starts
    pub fn closing_stream(mut self) -> Self {
        self.close_stream = true;
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn hanging_connect(mut self) -> Self {
        self.hang_connect = true;
        self
    }

    pub fn without_service(mut self) -> Self {
        self.service = None;
        self
    }

    pub fn without_characteristic(mut self) -> Self {
        self.characteristic = None;
        self
    }

    pub fn failing_get_service(mut self) -> Self {
        self.service_fault = Some(|| AdapterError::Gatt("protocol error".to_string()));
        self
    }

    /// Report the link as dropped when services are queried
    pub fn unreachable_on_get_service(mut self) -> Self {
        self.service_fault = Some(|| AdapterError::Unreachable("link lost".to_string()));
        self
    }

    pub fn failing_get_characteristic(mut self) -> Self {
        self.characteristic_fault = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Fail the zero-based `index`-th write
    pub fn failing_write(mut self, index: usize) -> Self {
        self.failing_writes.insert(index);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(*c)).count()
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Write(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_tx.lock().unwrap().is_some()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait(?Send)]
impl RadioAdapter for FakeAdapter {
    type Peripheral = String;
    type Service = FakeService;
    type Characteristic = FakeCharacteristic;

    async fn has_radio_permission(&self) -> bool {
        self.permission
    }

    fn start_scan(&self) -> Result<AdvertisementStream<String>, AdapterError> {
        self.record(Call::StartScan);
        if self.fail_start_scan {
            return Err(AdapterError::Scan("radio is off".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for scripted in self.advertisements.clone() {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(scripted.after).await;
                let _ = tx.send(Advertisement {
                    name: scripted.name,
                    peripheral: scripted.peripheral,
                });
            });
        }
        if !self.close_stream {
            *self.scan_tx.lock().unwrap() = Some(tx);
        }
        Ok(rx)
    }

    fn stop_scan(&self) -> Result<(), AdapterError> {
        self.record(Call::StopScan);
        self.scan_tx.lock().unwrap().take();
        Ok(())
    }

    async fn connect(&self, peripheral: &String) -> Result<(), AdapterError> {
        self.record(Call::Connect(peripheral.clone()));
        if self.hang_connect {
            std::future::pending::<()>().await;
        }
        if self.fail_connect {
            return Err(AdapterError::Connect("device unreachable".to_string()));
        }
        Ok(())
    }

    async fn get_service(
        &self,
        _peripheral: &String,
        service_id: Uuid,
    ) -> Result<Option<FakeService>, AdapterError> {
        self.record(Call::GetService(service_id));
        if let Some(fault) = self.service_fault {
            return Err(fault());
        }
        Ok(self
            .service
            .filter(|id| *id == service_id)
            .map(FakeService))
    }

    async fn get_characteristic(
        &self,
        _service: &FakeService,
        characteristic_id: Uuid,
    ) -> Result<Option<FakeCharacteristic>, AdapterError> {
        self.record(Call::GetCharacteristic(characteristic_id));
        if self.characteristic_fault {
            return Err(AdapterError::Gatt("access denied".to_string()));
        }
        Ok(self
            .characteristic
            .filter(|id| *id == characteristic_id)
            .map(FakeCharacteristic))
    }

    async fn write(
        &self,
        _characteristic: &FakeCharacteristic,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        self.record(Call::Write(String::from_utf8_lossy(payload).into_owned()));
        let index = {
            let mut issued = self.writes_issued.lock().unwrap();
            let index = *issued;
            *issued += 1;
            index
        };
        if self.failing_writes.contains(&index) {
            return Err(AdapterError::Write("GATT error 0x0e".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&self, peripheral: &String) -> Result<(), AdapterError> {
        self.record(Call::Disconnect(peripheral.clone()));
        if self.fail_disconnect {
            return Err(AdapterError::Connect("already closed".to_string()));
        }
        Ok(())
    }
}

//! BLE Scanner Module
//!
//! Bounded-duration discovery of a single peripheral by advertised name.

use crate::infrastructure::bluetooth::adapter::{AdapterError, RadioAdapter};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Result of a completed scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome<P> {
    Found(P),
    NotFound,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("could not start scanning: {0}")]
    Start(#[source] AdapterError),
    #[error("discovery stream closed before the scan finished")]
    StreamClosed,
}

/// Stops the scan exactly once, whichever way `find` exits
struct ScanGuard<'a, A: RadioAdapter> {
    adapter: &'a A,
    stopped: bool,
}

impl<'a, A: RadioAdapter> ScanGuard<'a, A> {
    fn new(adapter: &'a A) -> Self {
        Self {
            adapter,
            stopped: false,
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        debug!("Stopping BLE scan...");
        if let Err(e) = self.adapter.stop_scan() {
            warn!("Failed to stop scan: {}", e);
        }
    }
}

impl<A: RadioAdapter> Drop for ScanGuard<'_, A> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// BLE Scanner for discovering the reminder device
pub struct BleScanner<'a, A: RadioAdapter> {
    adapter: &'a A,
}

impl<'a, A: RadioAdapter> BleScanner<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self { adapter }
    }

    /// Scan until a device advertising exactly `target_name` shows up or
    /// `timeout` elapses.
    ///
    /// The first matching advertisement wins; anything queued behind it is
    /// discarded together with the stream. The radio is not scanning when
    /// this returns, or when the future is dropped mid-scan.
    pub async fn find(
        &self,
        target_name: &str,
        timeout: Duration,
    ) -> Result<ScanOutcome<A::Peripheral>, ScanError> {
        info!(
            "Starting BLE scan for '{}' ({}s timeout)",
            target_name,
            timeout.as_secs()
        );

        let mut events = self.adapter.start_scan().map_err(ScanError::Start)?;
        let mut guard = ScanGuard::new(self.adapter);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(adv) if adv.name.as_deref() == Some(target_name) => {
                        guard.stop();
                        info!("Found device '{}': {:?}", target_name, adv.peripheral);
                        return Ok(ScanOutcome::Found(adv.peripheral));
                    }
                    Some(adv) => {
                        trace!("Ignoring advertisement {:?} from {:?}", adv.name, adv.peripheral);
                    }
                    None => {
                        guard.stop();
                        warn!("Discovery stream closed mid-scan");
                        return Err(ScanError::StreamClosed);
                    }
                },
                _ = &mut deadline => {
                    guard.stop();
                    info!("Scan timed out without seeing '{}'", target_name);
                    return Ok(ScanOutcome::NotFound);
                }
            }
        }
    }
}

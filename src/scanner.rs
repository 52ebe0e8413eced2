use std::time::Duration;

use crate::adapter::{BleAdapter, DeviceDescriptor};
use crate::error::Error;
use crate::filter::DeviceFilter;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Accepts the devices the scan is looking for.
    filter: DeviceFilter,
    /// Number of discovery queries before giving up. Always at least 1.
    max_attempts: u32,
    /// Pause between two unsuccessful queries.
    retry_delay: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            filter: DeviceFilter::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ScanConfig {
    /// Filter scanned devices based on the device name
    pub fn filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Give up after given number of discovery queries
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Wait given duration between discovery queries
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn device_filter(&self) -> &DeviceFilter {
        &self.filter
    }
}

/// Polls the adapter for a device accepted by the configured filter.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Query the adapter until a device matches or the attempts run out.
    pub async fn scan<A: BleAdapter>(
        &self,
        adapter: &A,
    ) -> Result<DeviceDescriptor<A::DeviceId>, Error> {
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            let devices = match adapter.scan_devices().await {
                Ok(devices) => devices,
                Err(e) => {
                    log::warn!("Discovery query {}/{} failed: {}", attempt, max_attempts, e);
                    Vec::new()
                }
            };

            log::info!(
                "Scan attempt {}/{}: {} device(s) found",
                attempt,
                max_attempts,
                devices.len()
            );
            for device in &devices {
                log::debug!("- {}", device.label());
            }

            if let Some(device) = devices
                .into_iter()
                .find(|device| self.config.filter.matches(device))
            {
                log::info!("Found matching device: {}", device.label());
                return Ok(device);
            }

            if attempt < max_attempts {
                log::debug!(
                    "No matching device, retrying in {:?}",
                    self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(Error::NotFound {
            attempts: max_attempts,
        })
    }
}

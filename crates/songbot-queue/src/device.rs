use std::sync::Arc;
use std::time::Duration;

use common::backoff::Retry;
use thiserror::Error;

use crate::services::Catalog;

/// How device listing is retried while no devices show up.
const LISTING: Retry = Retry::constant(3, Duration::from_secs(2));
/// How long to let a transfer settle before checking on it.
const SETTLE: Duration = Duration::from_secs(5);
/// How a transfer is confirmed after settling.
const CONFIRMATION: Retry = Retry::constant(3, Duration::from_secs(2));

/// A playback device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("No playback devices available")]
    NoDevices,
    #[error("Failed to activate a playback device")]
    ActivationFailed,
}

/// Makes sure a playback device is active before anything is queued.
pub struct DeviceActivator {
    catalog: Arc<dyn Catalog>,
    preferred: Option<String>,
}

impl DeviceActivator {
    /// Construct a new activator.
    ///
    /// A `preferred` device name is matched case insensitively and used over
    /// the first listed device when nothing is active.
    pub fn new(catalog: Arc<dyn Catalog>, preferred: Option<String>) -> Self {
        Self { catalog, preferred }
    }

    /// Return the active device, activating one if needed.
    #[tracing::instrument(skip_all)]
    pub async fn ensure_active_device(&self) -> Result<Device, DeviceError> {
        let catalog = &self.catalog;

        let devices = LISTING
            .run("Listing devices", |_| catalog.devices(), |d: &Vec<Device>| !d.is_empty())
            .await
            .ok_or(DeviceError::NoDevices)?;

        if let Some(device) = devices.iter().find(|d| d.is_active) {
            return Ok(device.clone());
        }

        let target = self.pick(&devices).ok_or(DeviceError::NoDevices)?;
        tracing::info!("Transferring playback to {:?}", target.name);

        if let Err(e) = catalog.transfer_playback(&target.id, false).await {
            common::log_warn!(e, "Failed to transfer playback to {:?}", target.name);
            return Err(DeviceError::ActivationFailed);
        }

        tokio::time::sleep(SETTLE).await;

        let id = target.id.as_str();
        let is_target = |d: &Device| d.id == id && d.is_active;

        let devices = CONFIRMATION
            .run("Confirming activation", |_| catalog.devices(), |d: &Vec<Device>| {
                d.iter().any(is_target)
            })
            .await
            .ok_or(DeviceError::ActivationFailed)?;

        devices
            .into_iter()
            .find(is_target)
            .ok_or(DeviceError::ActivationFailed)
    }

    fn pick<'a>(&self, devices: &'a [Device]) -> Option<&'a Device> {
        if let Some(preferred) = &self.preferred {
            let device = devices.iter().find(|d| d.name.eq_ignore_ascii_case(preferred));

            if device.is_some() {
                return device;
            }

            tracing::warn!("Preferred device {:?} not available", preferred);
        }

        devices.first()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DeviceActivator, DeviceError};
    use crate::testing::{device, FakeCatalog};

    #[tokio::test(start_paused = true)]
    async fn test_uses_active_device() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.set_devices([device("a", "Laptop", false), device("b", "Phone", true)]);

        let activator = DeviceActivator::new(catalog.clone(), None);
        let device = activator.ensure_active_device().await.unwrap();

        assert_eq!(device.id, "b");
        assert!(catalog.transfers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_devices() {
        let catalog = Arc::new(FakeCatalog::new());
        let activator = DeviceActivator::new(catalog.clone(), None);

        assert_eq!(activator.ensure_active_device().await, Err(DeviceError::NoDevices));
        assert_eq!(catalog.device_listings(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activates_first_device() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.set_devices([device("a", "Laptop", false), device("b", "Phone", false)]);

        let activator = DeviceActivator::new(catalog.clone(), None);
        let device = activator.ensure_active_device().await.unwrap();

        assert_eq!(device.id, "a");
        assert!(device.is_active);
        assert_eq!(catalog.transfers(), vec![("a".to_owned(), false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activates_preferred_device() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.set_devices([device("a", "Laptop", false), device("b", "Stream PC", false)]);

        let activator = DeviceActivator::new(catalog.clone(), Some("stream pc".to_owned()));
        let device = activator.ensure_active_device().await.unwrap();

        assert_eq!(device.id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_not_confirmed() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.set_devices([device("a", "Laptop", false)]);
        catalog.ignore_transfers(true);

        let activator = DeviceActivator::new(catalog.clone(), None);

        assert_eq!(
            activator.ensure_active_device().await,
            Err(DeviceError::ActivationFailed)
        );
        // One listing, then three confirmation checks.
        assert_eq!(catalog.device_listings(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_error() {
        let catalog = Arc::new(FakeCatalog::new());
        catalog.set_devices([device("a", "Laptop", false)]);
        catalog.fail_transfers(true);

        let activator = DeviceActivator::new(catalog.clone(), None);

        assert_eq!(
            activator.ensure_active_device().await,
            Err(DeviceError::ActivationFailed)
        );
    }
}

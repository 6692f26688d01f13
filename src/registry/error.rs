//! Registry error types

use super::frame::DeviceId;

/// Error type for direct device sends
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No device is registered under this identifier
    #[error("device not connected: {0}")]
    DeviceNotConnected(DeviceId),
    /// The device is registered but its connection refused the frame
    #[error("delivery to device failed: {0}")]
    DeliveryFailed(DeviceId),
}

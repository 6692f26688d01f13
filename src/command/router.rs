//! Command router

use std::sync::Arc;

use serde::Serialize;

use crate::message::Command;
use crate::registry::{ConnectionRegistry, DeviceId, RegistryError};

/// Why a command could not be delivered
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No device is registered under the target id
    #[error("device not connected: {0}")]
    NotConnected(DeviceId),
    /// The device's connection refused the command
    #[error("command delivery failed: {0}")]
    DeliveryFailed(DeviceId),
    /// The command could not be serialized
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<RegistryError> for CommandError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DeviceNotConnected(id) => CommandError::NotConnected(id),
            RegistryError::DeliveryFailed(id) => CommandError::DeliveryFailed(id),
        }
    }
}

/// Acknowledgement returned for a delivered command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReceipt {
    pub status: &'static str,
    pub action: String,
}

/// Routes commands to registered devices
#[derive(Clone)]
pub struct CommandRouter {
    registry: Arc<ConnectionRegistry>,
}

impl CommandRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver a command to a device
    ///
    /// Fails with `NotConnected` exactly when no device is registered under
    /// `device_id`.
    pub async fn submit(
        &self,
        device_id: &DeviceId,
        command: &Command,
    ) -> Result<CommandReceipt, CommandError> {
        let result = self.deliver(device_id, command).await;
        self.registry.stats().record_command(result.is_ok());

        match &result {
            Ok(_) => tracing::info!(
                device_id = %device_id,
                action = %command.action,
                "Command sent"
            ),
            Err(err) => tracing::warn!(
                device_id = %device_id,
                action = %command.action,
                error = %err,
                "Command rejected"
            ),
        }

        result
    }

    async fn deliver(
        &self,
        device_id: &DeviceId,
        command: &Command,
    ) -> Result<CommandReceipt, CommandError> {
        let frame = command.encode()?;
        self.registry.send_to_device(device_id, frame).await?;

        Ok(CommandReceipt {
            status: "sent",
            action: command.action.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn test_submit_to_connected_device() {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = CommandRouter::new(Arc::clone(&registry));
        let id = DeviceId::from("humanoid_001");
        let (handle, mut rx) = registry.open_connection();
        registry.register_device(id.clone(), handle).await;

        let receipt = assert_ok!(router.submit(&id, &Command::new("STOP")).await);

        assert_eq!(receipt.status, "sent");
        assert_eq!(receipt.action, "STOP");
        let frame = rx.recv().await.unwrap();
        assert_eq!(Command::decode(&frame).unwrap(), Command::new("STOP"));
    }

    #[tokio::test]
    async fn test_submit_after_disconnect() {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = CommandRouter::new(Arc::clone(&registry));
        let id = DeviceId::from("humanoid_001");
        let (handle, _rx) = registry.open_connection();
        let connection_id = handle.id();
        registry.register_device(id.clone(), handle).await;
        registry.release_device(&id, connection_id).await;

        let result = router.submit(&id, &Command::new("STOP")).await;

        assert!(matches!(result, Err(CommandError::NotConnected(ref d)) if *d == id));
    }

    #[tokio::test]
    async fn test_submit_delivery_failure() {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = CommandRouter::new(Arc::clone(&registry));
        let id = DeviceId::from("humanoid_001");
        let (handle, rx) = registry.open_connection();
        registry.register_device(id.clone(), handle).await;
        drop(rx);

        let result = router.submit(&id, &Command::new("REBOOT")).await;

        assert!(matches!(result, Err(CommandError::DeliveryFailed(_))));
        // No automatic unregistration
        assert!(registry.has_device(&id).await);
    }

    #[tokio::test]
    async fn test_submit_counts_outcomes() {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = CommandRouter::new(Arc::clone(&registry));
        let id = DeviceId::from("humanoid_001");

        let _ = router.submit(&id, &Command::new("STOP")).await;
        let (handle, _rx) = registry.open_connection();
        registry.register_device(id.clone(), handle).await;
        let _ = router.submit(&id, &Command::new("START")).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.commands_sent, 1);
        assert_eq!(snapshot.commands_rejected, 1);
    }
}

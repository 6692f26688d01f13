//! Shared handler state

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::command::CommandRouter;
use crate::registry::{Channel, ConnectionRegistry};
use crate::relay::{ChannelRelay, ChannelRole};
use crate::server::config::ServerConfig;

/// State shared by every HTTP and WebSocket handler
#[derive(Clone)]
pub struct RelayState {
    pub registry: Arc<ConnectionRegistry>,
    pub commands: CommandRouter,
    pub config: Arc<ServerConfig>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

/// The connection limit is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtCapacity;

impl RelayState {
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };
        let registry = Arc::new(ConnectionRegistry::with_config(config.registry.clone()));

        Self {
            commands: CommandRouter::new(Arc::clone(&registry)),
            registry,
            config: Arc::new(config),
            connection_semaphore,
        }
    }

    /// Reserve a slot for a new WebSocket connection
    ///
    /// The slot is held until the returned permit is dropped. `None` means
    /// connections are unlimited.
    pub fn admit(&self) -> Result<Option<OwnedSemaphorePermit>, AtCapacity> {
        let permit = match &self.connection_semaphore {
            Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.registry.stats().record_connection(false);
                    return Err(AtCapacity);
                }
            },
            None => None,
        };
        self.registry.stats().record_connection(true);
        Ok(permit)
    }

    /// Relay for `channel`, mirrored to the dashboard when configured
    pub fn relay(&self, channel: Channel, role: ChannelRole) -> ChannelRelay {
        let relay = ChannelRelay::new(Arc::clone(&self.registry), channel, role);
        match role {
            ChannelRole::Observer => relay,
            ChannelRole::DeviceCommand | ChannelRole::Producer => {
                relay.with_mirror(self.config.mirror_channel())
            }
        }
    }
}

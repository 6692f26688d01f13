//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};

use crate::registry::{Channel, DeviceId, RegistryConfig};

/// Device id registered by command-channel connections that do not supply one
pub const DEFAULT_DEVICE_ID: &str = "humanoid_001";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8001;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent WebSocket connections (0 = unlimited)
    pub max_connections: usize,

    /// Device id used when the handshake does not carry `device_id`
    pub default_device_id: DeviceId,

    /// Device-origin broadcast channels accepted at `/ws/{channel}`
    pub broadcast_channels: Vec<Channel>,

    /// Also broadcast all device traffic on the dashboard channel
    pub mirror_dashboard: bool,

    /// Registry settings (outbound queues)
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            default_device_id: DeviceId::from(DEFAULT_DEVICE_ID),
            broadcast_channels: vec![Channel::video(), Channel::kinematics()],
            mirror_dashboard: false,
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the device id used when none is supplied at handshake
    pub fn default_device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.default_device_id = id.into();
        self
    }

    /// Replace the set of device-origin broadcast channels
    ///
    /// The command channel and the dashboard channel are reserved and are
    /// ignored here.
    pub fn broadcast_channels<I>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = Channel>,
    {
        self.broadcast_channels.clear();
        for channel in channels {
            if is_reserved(&channel) || self.broadcast_channels.contains(&channel) {
                continue;
            }
            self.broadcast_channels.push(channel);
        }
        self
    }

    /// Mirror device traffic onto the dashboard channel
    pub fn mirror_dashboard(mut self, enabled: bool) -> Self {
        self.mirror_dashboard = enabled;
        self
    }

    /// Set registry configuration
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry = config;
        self
    }

    /// Whether devices may produce on this channel at `/ws/{channel}`
    pub fn is_broadcast_channel(&self, channel: &Channel) -> bool {
        self.broadcast_channels.contains(channel)
    }

    /// Whether observers may subscribe to this channel
    pub fn is_observable(&self, channel: &Channel) -> bool {
        is_reserved(channel) || self.is_broadcast_channel(channel)
    }

    /// Channel observers receive mirrored device traffic on, if enabled
    pub fn mirror_channel(&self) -> Option<Channel> {
        self.mirror_dashboard.then(Channel::dashboard)
    }
}

fn is_reserved(channel: &Channel) -> bool {
    matches!(channel.name(), Channel::TELEMETRY | Channel::DASHBOARD)
}

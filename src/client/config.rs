//! Client configuration

use crate::registry::{Channel, DeviceId};
use crate::server::config::DEFAULT_DEVICE_ID;

/// Client configuration for device and observer links
///
/// Device ids and channel names are placed in URLs as-is and are expected
/// to be URL-safe.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay base URL, e.g. `ws://127.0.0.1:8001`
    pub base_url: String,

    /// Id the device registers under
    pub device_id: DeviceId,

    /// Broadcast channels the device opens a producer stream for
    pub producer_channels: Vec<Channel>,
}

impl ClientConfig {
    /// Create a config for the relay at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            device_id: DeviceId::from(DEFAULT_DEVICE_ID),
            producer_channels: vec![Channel::video(), Channel::kinematics()],
        }
    }

    /// Set the device id
    pub fn device_id(mut self, id: impl Into<DeviceId>) -> Self {
        self.device_id = id.into();
        self
    }

    /// Set the producer channels
    pub fn producer_channels<I>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = Channel>,
    {
        self.producer_channels = channels.into_iter().collect();
        self
    }

    /// URL of the device command channel
    pub fn telemetry_url(&self) -> String {
        format!("{}/ws/telemetry?device_id={}", self.base_url, self.device_id)
    }

    /// URL of a producer stream
    pub fn producer_url(&self, channel: &Channel) -> String {
        format!("{}/ws/{}", self.base_url, channel)
    }

    /// URL an observer of `channel` connects to
    pub fn observer_url(&self, channel: &Channel) -> String {
        if *channel == Channel::dashboard() {
            format!("{}/ws/dashboard", self.base_url)
        } else {
            format!("{}/ws/observe/{}", self.base_url, channel)
        }
    }
}

//! Connection registry implementation
//!
//! The central registry that tracks device and observer connections and
//! routes frames between them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::entry::{ConnectionHandle, Delivery, ObserverTable};
use super::error::RegistryError;
use super::frame::{Channel, ConnectionId, DeviceId, Frame};
use crate::stats::{ChannelSnapshot, RelayStats, StatsSnapshot};

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Observers that accepted the frame
    pub delivered: usize,
    /// Observers removed because delivery failed
    pub pruned: usize,
}

/// Central registry for all live connections
///
/// Thread-safe via `RwLock`. Broadcasts clone the channel membership under
/// the read lock and send without holding it, so a slow observer never
/// blocks registration or removal on other connections.
pub struct ConnectionRegistry {
    /// Device connections keyed by device id
    devices: RwLock<HashMap<DeviceId, ConnectionHandle>>,

    /// Observer membership per channel
    observers: RwLock<ObserverTable>,

    /// Source of connection ids
    next_connection_id: AtomicU64,

    stats: RelayStats,

    config: RegistryConfig,
}

impl ConnectionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            observers: RwLock::new(ObserverTable::default()),
            next_connection_id: AtomicU64::new(1),
            stats: RelayStats::new(),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Relay counters
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Allocate an id for a newly accepted connection
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a handle with a fresh id and the configured queue capacity
    ///
    /// The caller drains the returned receiver into its transport.
    pub fn open_connection(&self) -> (ConnectionHandle, tokio::sync::mpsc::Receiver<Frame>) {
        ConnectionHandle::channel(self.next_connection_id(), self.config.outbound_capacity)
    }

    /// Register a device connection
    ///
    /// Replaces any connection already registered under `id`. Closing the
    /// replaced connection is left to its transport.
    pub async fn register_device(&self, id: DeviceId, handle: ConnectionHandle) {
        let connection_id = handle.id();
        let mut devices = self.devices.write().await;

        match devices.insert(id.clone(), handle) {
            Some(previous) => {
                tracing::warn!(
                    device_id = %id,
                    connection_id = %connection_id,
                    replaced = %previous.id(),
                    "Device registered, replacing existing connection"
                );
            }
            None => {
                tracing::info!(
                    device_id = %id,
                    connection_id = %connection_id,
                    "Device registered"
                );
            }
        }
    }

    /// Unregister a device regardless of which connection holds the id
    ///
    /// Returns whether a device was removed. Absent ids are a no-op.
    pub async fn unregister_device(&self, id: &DeviceId) -> bool {
        let removed = self.devices.write().await.remove(id);

        if let Some(handle) = &removed {
            tracing::info!(
                device_id = %id,
                connection_id = %handle.id(),
                "Device unregistered"
            );
        }

        removed.is_some()
    }

    /// Unregister a device only if `connection_id` still holds the id
    ///
    /// A connection that was replaced by a newer registration must not
    /// evict its replacement when it finally disconnects.
    pub async fn release_device(&self, id: &DeviceId, connection_id: ConnectionId) -> bool {
        let mut devices = self.devices.write().await;

        match devices.get(id) {
            Some(handle) if handle.id() == connection_id => {
                devices.remove(id);
                tracing::info!(
                    device_id = %id,
                    connection_id = %connection_id,
                    "Device disconnected"
                );
                true
            }
            Some(handle) => {
                tracing::warn!(
                    device_id = %id,
                    expected = %handle.id(),
                    actual = %connection_id,
                    "Device release mismatch, keeping newer connection"
                );
                false
            }
            None => false,
        }
    }

    /// Check whether a device is registered
    pub async fn has_device(&self, id: &DeviceId) -> bool {
        self.devices.read().await.contains_key(id)
    }

    /// Registered device ids, sorted
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Send a frame directly to a device
    ///
    /// A failed delivery does not unregister the device; the transport's
    /// own disconnect notification does that.
    pub async fn send_to_device(&self, id: &DeviceId, frame: Frame) -> Result<(), RegistryError> {
        let handle = self
            .devices
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::DeviceNotConnected(id.clone()))?;

        match handle.deliver(frame, self.config.overflow_policy).await {
            Delivery::Accepted => Ok(()),
            outcome => {
                tracing::warn!(
                    device_id = %id,
                    connection_id = %handle.id(),
                    ?outcome,
                    "Device delivery failed"
                );
                Err(RegistryError::DeliveryFailed(id.clone()))
            }
        }
    }

    /// Subscribe an observer connection to a channel
    ///
    /// A connection observes one channel at a time; adding it to a new
    /// channel moves it.
    pub async fn add_observer(&self, channel: &Channel, handle: ConnectionHandle) {
        let connection_id = handle.id();
        let mut observers = self.observers.write().await;
        let moved_from = observers.insert(channel, handle);

        tracing::info!(
            channel = %channel,
            connection_id = %connection_id,
            moved_from = ?moved_from.as_ref().map(Channel::name),
            observers = observers.count(channel),
            "Observer added"
        );
    }

    /// Remove an observer from a channel. Safe to call repeatedly.
    pub async fn remove_observer(&self, channel: &Channel, connection_id: ConnectionId) -> bool {
        let mut observers = self.observers.write().await;
        let removed = observers.remove(channel, connection_id);

        if removed {
            tracing::info!(
                channel = %channel,
                connection_id = %connection_id,
                observers = observers.count(channel),
                "Observer removed"
            );
        }

        removed
    }

    /// Check whether a connection currently observes a channel
    pub async fn is_observing(&self, channel: &Channel, connection_id: ConnectionId) -> bool {
        self.observers.read().await.contains(channel, connection_id)
    }

    /// Number of observers on a channel
    pub async fn observer_count(&self, channel: &Channel) -> usize {
        self.observers.read().await.count(channel)
    }

    /// Channels with at least one observer, sorted by name
    pub async fn channels(&self) -> Vec<Channel> {
        self.observers.read().await.counts().into_keys().collect()
    }

    /// Deliver a frame to every observer of a channel
    ///
    /// Observers whose delivery fails are removed before this returns.
    /// Iteration order across observers is unspecified.
    pub async fn broadcast(&self, channel: &Channel, frame: Frame) -> BroadcastReport {
        let members = self.observers.read().await.snapshot(channel);
        if members.is_empty() {
            return BroadcastReport::default();
        }

        let policy = self.config.overflow_policy;
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for member in &members {
            match member.deliver(frame.clone(), policy).await {
                Delivery::Accepted => report.delivered += 1,
                outcome => failed.push((member.id(), outcome)),
            }
        }

        if !failed.is_empty() {
            let mut observers = self.observers.write().await;
            for (connection_id, outcome) in failed {
                if observers.remove(channel, connection_id) {
                    report.pruned += 1;
                    tracing::debug!(
                        channel = %channel,
                        connection_id = %connection_id,
                        ?outcome,
                        "Observer pruned after failed delivery"
                    );
                }
            }
        }

        self.stats.record_delivered(report.delivered);
        self.stats.record_pruned(report.pruned);

        tracing::trace!(
            channel = %channel,
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast frame"
        );

        report
    }

    /// Snapshot of counters plus the live device and channel view
    pub async fn snapshot(&self) -> StatsSnapshot {
        let devices = self
            .device_ids()
            .await
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        let channels = self
            .observers
            .read()
            .await
            .counts()
            .into_iter()
            .map(|(channel, observers)| ChannelSnapshot {
                channel: channel.to_string(),
                observers,
            })
            .collect();

        self.stats.snapshot(devices, channels)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Statistics and counters for the relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Process-wide relay counters
///
/// All counters are monotonic and updated with relaxed atomics; a snapshot
/// is a best-effort view, not a consistent cut.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    frames_received: AtomicU64,
    frames_delivered: AtomicU64,
    bytes_received: AtomicU64,
    observers_pruned: AtomicU64,
    commands_sent: AtomicU64,
    commands_rejected: AtomicU64,
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
}

impl RelayStats {
    /// Create a zeroed stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_received: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            observers_pruned: AtomicU64::new(0),
            commands_sent: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            connections_accepted: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
        }
    }

    /// Record one inbound frame of `bytes` size
    pub fn record_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, count: usize) {
        self.frames_delivered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_pruned(&self, count: usize) {
        self.observers_pruned
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_command(&self, accepted: bool) {
        if accepted {
            self.commands_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commands_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_connection(&self, accepted: bool) {
        if accepted {
            self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.connections_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Time since the tracker was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Inbound rate in bits per second since start
    pub fn inbound_bitrate(&self) -> u64 {
        let secs = self.uptime().as_secs();
        if secs > 0 {
            (self.bytes_received.load(Ordering::Relaxed) * 8) / secs
        } else {
            0
        }
    }

    /// Copy the counters into a snapshot with the given live view
    pub fn snapshot(&self, devices: Vec<String>, channels: Vec<ChannelSnapshot>) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            observers_pruned: self.observers_pruned.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            inbound_bitrate: self.inbound_bitrate(),
            devices,
            channels,
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer count for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub channel: String,
    pub observers: usize,
}

/// Point-in-time view of the relay, served at `/api/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub frames_received: u64,
    pub frames_delivered: u64,
    pub bytes_received: u64,
    pub observers_pruned: u64,
    pub commands_sent: u64,
    pub commands_rejected: u64,
    pub connections_accepted: u64,
    pub connections_rejected: u64,
    /// Inbound bits per second averaged over uptime
    pub inbound_bitrate: u64,
    /// Currently registered device ids
    pub devices: Vec<String>,
    /// Channels with at least one observer
    pub channels: Vec<ChannelSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = RelayStats::new();
        let snapshot = stats.snapshot(Vec::new(), Vec::new());

        assert_eq!(snapshot.frames_received, 0);
        assert_eq!(snapshot.frames_delivered, 0);
        assert_eq!(snapshot.observers_pruned, 0);
        assert_eq!(snapshot.commands_sent, 0);
        assert_eq!(snapshot.commands_rejected, 0);
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn test_counters() {
        let stats = RelayStats::new();
        stats.record_received(100);
        stats.record_received(50);
        stats.record_delivered(3);
        stats.record_pruned(1);
        stats.record_command(true);
        stats.record_command(false);
        stats.record_command(false);
        stats.record_connection(true);

        let snapshot = stats.snapshot(
            vec!["humanoid_001".to_string()],
            vec![ChannelSnapshot {
                channel: "video".to_string(),
                observers: 2,
            }],
        );

        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.bytes_received, 150);
        assert_eq!(snapshot.frames_delivered, 3);
        assert_eq!(snapshot.observers_pruned, 1);
        assert_eq!(snapshot.commands_sent, 1);
        assert_eq!(snapshot.commands_rejected, 2);
        assert_eq!(snapshot.connections_accepted, 1);
        assert_eq!(snapshot.connections_rejected, 0);
        assert_eq!(snapshot.devices, vec!["humanoid_001"]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = RelayStats::new();
        let snapshot = stats.snapshot(Vec::new(), Vec::new());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["frames_received"], 0);
        assert!(json["channels"].as_array().unwrap().is_empty());
    }
}

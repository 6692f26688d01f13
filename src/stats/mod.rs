//! Relay statistics

pub mod metrics;

pub use metrics::{ChannelSnapshot, RelayStats, StatsSnapshot};

//! robot-relay: WebSocket relay between robots and dashboards
//!
//! Devices connect over WebSocket and stream telemetry, video and
//! kinematics frames; the relay fans each frame out verbatim to every
//! observer subscribed to that channel. Operators send commands to a
//! device over HTTP, and the relay forwards them on the device's command
//! channel.
//!
//! # Example
//! ```no_run
//! use robot_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> robot_relay::Result<()> {
//! let config = ServerConfig::default().mirror_dashboard(true);
//! let server = RelayServer::new(config);
//!
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod message;
pub mod registry;
pub mod relay;
pub mod server;
pub mod stats;

pub use client::{ClientConfig, DeviceLink, ObserverLink};
pub use command::{CommandError, CommandReceipt, CommandRouter};
pub use error::{Error, Result};
pub use message::{Command, TelemetryMessage};
pub use registry::{
    Channel, ConnectionRegistry, DeviceId, Frame, OverflowPolicy, RegistryConfig, RegistryError,
};
pub use relay::{ChannelRelay, ChannelRole};
pub use server::{RelayServer, ServerConfig};

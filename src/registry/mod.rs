//! Connection registry for device/observer routing
//!
//! The registry tracks the live device connections (keyed by device id) and
//! the observer connections subscribed to each channel. It knows nothing
//! about message content.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ConnectionRegistry>
//!                 ┌────────────────────────────────┐
//!                 │ devices:   HashMap<DeviceId,   │
//!                 │              ConnectionHandle> │
//!                 │ observers: Channel ->          │
//!                 │              {ConnectionHandle}│
//!                 └───────────────┬────────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Device pump]          [Observer writer]       [Command router]
//!    socket.next()          rx.recv() ──► WS        send_to_device()
//!         │                       ▲
//!         └──► registry.broadcast()┘
//! ```
//!
//! Each `ConnectionHandle` is the sending half of a bounded queue drained by
//! that connection's writer task. A closed or overflowing queue is reported
//! as a `Delivery` value; broadcast prunes the observer, direct sends report
//! it to the caller.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use config::{OverflowPolicy, RegistryConfig};
pub use entry::{ConnectionHandle, Delivery};
pub use error::RegistryError;
pub use frame::{Channel, ConnectionId, DeviceId, Frame};
pub use store::{BroadcastReport, ConnectionRegistry};

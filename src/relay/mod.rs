//! Channel relays
//!
//! One relay per logical channel pumps frames from the connection that owns
//! the channel into the registry:
//!
//! | Role | Connects | On connect | Per frame | On disconnect |
//! |------|----------|------------|-----------|---------------|
//! | `DeviceCommand` | device | `register_device` | `broadcast` | `release_device` |
//! | `Producer` | device | - | `broadcast` | - |
//! | `Observer` | dashboard | `add_observer` | discard | `remove_observer` |
//!
//! Frames are forwarded verbatim. Per-connection order is preserved because
//! each pump awaits a broadcast before reading its next frame.

pub mod channel;

pub use channel::{ChannelRelay, ChannelRole, RelaySummary};

//! Command routing from observers to devices
//!
//! Commands arrive through the one-shot HTTP endpoint and are delivered over
//! the device's command channel connection. There is no queueing or retry: a
//! command for a device that is not connected fails immediately.

pub mod router;

pub use router::{CommandError, CommandReceipt, CommandRouter};

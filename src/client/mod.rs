//! Relay client links
//!
//! - [`DeviceLink`]: a device's side. Opens the command channel plus one
//!   stream per producer channel, sends telemetry, receives commands.
//! - [`ObserverLink`]: a subscriber to one channel.

pub mod config;
pub mod device;
pub mod observer;

pub use config::ClientConfig;
pub use device::DeviceLink;
pub use observer::ObserverLink;

use tokio_tungstenite::tungstenite::Message;

use crate::registry::Frame;

pub(crate) fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::text(String::from(&*text)),
        Frame::Binary(data) => Message::Binary(data),
    }
}

/// Data frame carried by `message`, if any
pub(crate) fn to_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::text(text.as_str())),
        Message::Binary(data) => Some(Frame::Binary(data)),
        _ => None,
    }
}

//! Keys and payload types for relay routing
//!
//! This module defines the identifiers used to address devices and channels,
//! and the frames that are carried between them.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Identifier of a controlled device (e.g., "humanoid_001")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A logical partition of relay traffic
///
/// Each channel has its own endpoint and its own observer membership.
/// Channels do not share ordering with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(String);

impl Channel {
    /// Device state and command link
    pub const TELEMETRY: &'static str = "telemetry";
    /// Camera frames
    pub const VIDEO: &'static str = "video";
    /// Joint angles
    pub const KINEMATICS: &'static str = "kinematics";
    /// Dashboard presence
    pub const DASHBOARD: &'static str = "dashboard";

    /// Create a channel with an arbitrary name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn telemetry() -> Self {
        Self::new(Self::TELEMETRY)
    }

    pub fn video() -> Self {
        Self::new(Self::VIDEO)
    }

    pub fn kinematics() -> Self {
        Self::new(Self::KINEMATICS)
    }

    pub fn dashboard() -> Self {
        Self::new(Self::DASHBOARD)
    }

    /// Channel name as used in endpoint paths
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Registry-assigned identity of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One message as carried by the relay
///
/// Cheap to clone: text is shared through `Arc<str>` and binary payloads
/// through `Bytes` reference counting, so fan-out never copies the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message (JSON in practice)
    Text(Arc<str>),
    /// Opaque binary message
    Binary(Bytes),
}

impl Frame {
    /// Create a text frame
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Frame::Text(text.into())
    }

    /// Create a binary frame
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Frame::Binary(data.into())
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The text payload, if this is a text frame
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(text) => Some(text),
            Frame::Binary(_) => None,
        }
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text.into())
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.into())
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Frame::Binary(data)
    }
}

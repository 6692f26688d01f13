//! Connection handles and per-channel membership
//!
//! A `ConnectionHandle` is the registry's sending end of one live connection.
//! The transport owns the receiving end and drains it into the socket; once
//! that writer is gone every delivery attempt reports `Delivery::Closed`.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::config::OverflowPolicy;
use super::frame::{Channel, ConnectionId, Frame};

/// Outcome of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was queued for the connection's writer
    Accepted,
    /// The connection's writer has gone away
    Closed,
    /// The outbound queue was full and the policy is `Disconnect`
    Overflow,
}

impl Delivery {
    /// Whether the transport accepted the frame
    pub fn is_accepted(self) -> bool {
        self == Delivery::Accepted
    }
}

/// Sending end of a live connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
}

impl ConnectionHandle {
    /// Wrap an existing outbound queue
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Frame>) -> Self {
        Self { id, tx }
    }

    /// Create a handle together with the receiver its writer should drain
    pub fn channel(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, tx), rx)
    }

    /// Registry-assigned identity
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the writer side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Attempt to queue a frame for this connection
    pub async fn deliver(&self, frame: Frame, policy: OverflowPolicy) -> Delivery {
        match policy {
            OverflowPolicy::Wait => match self.tx.send(frame).await {
                Ok(()) => Delivery::Accepted,
                Err(_) => Delivery::Closed,
            },
            OverflowPolicy::Disconnect => match self.tx.try_send(frame) {
                Ok(()) => Delivery::Accepted,
                Err(TrySendError::Full(_)) => Delivery::Overflow,
                Err(TrySendError::Closed(_)) => Delivery::Closed,
            },
        }
    }
}

/// Observer membership for every channel
///
/// Keeps a reverse index so that a connection is a member of at most one
/// channel at a time.
#[derive(Debug, Default)]
pub(super) struct ObserverTable {
    channels: HashMap<Channel, BTreeMap<ConnectionId, ConnectionHandle>>,
    index: HashMap<ConnectionId, Channel>,
}

impl ObserverTable {
    /// Insert a handle, moving it out of any channel it was already in.
    ///
    /// Returns the channel the handle was moved from.
    pub(super) fn insert(&mut self, channel: &Channel, handle: ConnectionHandle) -> Option<Channel> {
        let id = handle.id();
        let previous = match self.index.insert(id, channel.clone()) {
            Some(previous) if previous != *channel => {
                self.remove_member(&previous, id);
                Some(previous)
            }
            _ => None,
        };

        self.channels
            .entry(channel.clone())
            .or_default()
            .insert(id, handle);

        previous
    }

    /// Remove a handle from a channel. Returns whether it was a member.
    pub(super) fn remove(&mut self, channel: &Channel, id: ConnectionId) -> bool {
        if self.index.get(&id) != Some(channel) {
            return false;
        }
        self.index.remove(&id);
        self.remove_member(channel, id)
    }

    fn remove_member(&mut self, channel: &Channel, id: ConnectionId) -> bool {
        let Some(members) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = members.remove(&id).is_some();
        if members.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// Clone the current members of a channel
    pub(super) fn snapshot(&self, channel: &Channel) -> Vec<ConnectionHandle> {
        self.channels
            .get(channel)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(super) fn count(&self, channel: &Channel) -> usize {
        self.channels.get(channel).map_or(0, BTreeMap::len)
    }

    /// Channels with at least one observer, and their sizes
    pub(super) fn counts(&self) -> BTreeMap<Channel, usize> {
        self.channels
            .iter()
            .map(|(channel, members)| (channel.clone(), members.len()))
            .collect()
    }

    pub(super) fn contains(&self, channel: &Channel, id: ConnectionId) -> bool {
        self.index.get(&id) == Some(channel)
    }
}

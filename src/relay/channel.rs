//! Per-channel pump loops
//!
//! Each accepted connection runs exactly one of these loops until its
//! inbound stream ends. The loops are transport-agnostic: inbound traffic is
//! any stream of frames, and a stream error is handled as a disconnect.

use std::fmt;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::registry::{Channel, ConnectionHandle, ConnectionRegistry, DeviceId, Frame};

/// Which side connects to a channel and what the relay does with its traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    /// The device's command/state link: registers the device, broadcasts its frames
    DeviceCommand,
    /// A device-origin stream: broadcasts frames, registers nothing
    Producer,
    /// A subscriber: receives broadcasts, inbound traffic is discarded
    Observer,
}

/// What a pump loop did before its connection ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    /// Inbound frames read from the connection
    pub frames: u64,
    /// Whether the loop ended on a transport error rather than a clean close
    pub errored: bool,
}

/// Relay for one logical channel
#[derive(Clone)]
pub struct ChannelRelay {
    registry: Arc<ConnectionRegistry>,
    channel: Channel,
    role: ChannelRole,
    mirror: Option<Channel>,
}

impl ChannelRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, channel: Channel, role: ChannelRole) -> Self {
        Self {
            registry,
            channel,
            role,
            mirror: None,
        }
    }

    /// Also broadcast every device frame on `mirror`
    pub fn with_mirror(mut self, mirror: Option<Channel>) -> Self {
        self.mirror = mirror.filter(|m| *m != self.channel);
        self
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn mirror(&self) -> Option<&Channel> {
        self.mirror.as_ref()
    }

    /// Pump a device-origin stream into the channel
    pub async fn run_producer<S, E>(&self, inbound: S) -> RelaySummary
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: fmt::Display,
    {
        self.pump(inbound).await
    }

    /// Register the device, pump its frames, release it on disconnect
    pub async fn run_device<S, E>(
        &self,
        device_id: DeviceId,
        handle: ConnectionHandle,
        inbound: S,
    ) -> RelaySummary
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: fmt::Display,
    {
        let connection_id = handle.id();
        self.registry.register_device(device_id.clone(), handle).await;

        let summary = self.pump(inbound).await;

        self.registry.release_device(&device_id, connection_id).await;
        summary
    }

    /// Subscribe the observer, drain its inbound traffic, remove it on disconnect
    pub async fn run_observer<S, E>(&self, handle: ConnectionHandle, mut inbound: S) -> RelaySummary
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: fmt::Display,
    {
        let connection_id = handle.id();
        self.registry.add_observer(&self.channel, handle).await;

        let mut summary = RelaySummary::default();
        while let Some(item) = inbound.next().await {
            match item {
                Ok(_) => summary.frames += 1,
                Err(e) => {
                    tracing::debug!(
                        channel = %self.channel,
                        connection_id = %connection_id,
                        error = %e,
                        "Observer connection error"
                    );
                    summary.errored = true;
                    break;
                }
            }
        }

        self.registry
            .remove_observer(&self.channel, connection_id)
            .await;
        summary
    }

    /// Forward each inbound frame verbatim, one at a time
    async fn pump<S, E>(&self, mut inbound: S) -> RelaySummary
    where
        S: Stream<Item = Result<Frame, E>> + Unpin,
        E: fmt::Display,
    {
        let mut summary = RelaySummary::default();

        while let Some(item) = inbound.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(channel = %self.channel, error = %e, "Inbound stream error");
                    summary.errored = true;
                    break;
                }
            };

            summary.frames += 1;
            self.registry.stats().record_received(frame.len());

            if let Some(mirror) = &self.mirror {
                self.registry.broadcast(mirror, frame.clone()).await;
            }
            self.registry.broadcast(&self.channel, frame).await;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use tokio::sync::mpsc;

    use super::*;

    fn frames(items: &[&str]) -> impl Stream<Item = Result<Frame, String>> + Unpin {
        let items: Vec<Result<Frame, String>> = items.iter().map(|s| Ok(Frame::from(*s))).collect();
        stream::iter(items)
    }

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(frame);
        }
        out
    }

    #[tokio::test]
    async fn test_producer_forwards_in_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = ChannelRelay::new(Arc::clone(&registry), Channel::video(), ChannelRole::Producer);
        let (o1, mut rx1) = registry.open_connection();
        let (o2, mut rx2) = registry.open_connection();
        registry.add_observer(&Channel::video(), o1).await;
        registry.add_observer(&Channel::video(), o2).await;

        let summary = relay.run_producer(frames(&["m1", "m2"])).await;

        assert_eq!(summary, RelaySummary { frames: 2, errored: false });
        let expected = vec![Frame::from("m1"), Frame::from("m2")];
        assert_eq!(drain(&mut rx1), expected);
        assert_eq!(drain(&mut rx2), expected);
    }

    #[tokio::test]
    async fn test_producer_stops_on_error() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = ChannelRelay::new(Arc::clone(&registry), Channel::video(), ChannelRole::Producer);
        let (o, mut rx) = registry.open_connection();
        registry.add_observer(&Channel::video(), o).await;

        let inbound = stream::iter(vec![
            Ok(Frame::from("m1")),
            Err("malformed frame".to_string()),
            Ok(Frame::from("m2")),
        ]);
        let summary = relay.run_producer(inbound).await;

        assert_eq!(summary, RelaySummary { frames: 1, errored: true });
        assert_eq!(drain(&mut rx), vec![Frame::from("m1")]);
    }

    #[tokio::test]
    async fn test_device_registers_and_releases() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = ChannelRelay::new(
            Arc::clone(&registry),
            Channel::telemetry(),
            ChannelRole::DeviceCommand,
        );
        let id = DeviceId::from("humanoid_001");
        let (device, _device_rx) = registry.open_connection();
        let (tx, rx) = mpsc::channel::<Result<Frame, String>>(4);

        let task = {
            let relay = relay.clone();
            let id = id.clone();
            tokio::spawn(async move {
                relay
                    .run_device(id, device, receiver_stream(rx))
                    .await
            })
        };

        // Registered while the connection is open
        tx.send(Ok(Frame::from("hello"))).await.unwrap();
        wait_until(|| {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            async move { registry.has_device(&id).await }
        })
        .await;

        drop(tx);
        let summary = task.await.unwrap();

        assert_eq!(summary.frames, 1);
        assert!(!registry.has_device(&id).await);
    }

    #[tokio::test]
    async fn test_observer_lifecycle() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = ChannelRelay::new(
            Arc::clone(&registry),
            Channel::dashboard(),
            ChannelRole::Observer,
        );
        let (o, _rx) = registry.open_connection();

        // Inbound chatter from the observer is read and discarded
        let summary = relay.run_observer(o, frames(&["ping", "ping"])).await;

        assert_eq!(summary.frames, 2);
        assert_eq!(registry.observer_count(&Channel::dashboard()).await, 0);
    }

    #[tokio::test]
    async fn test_mirror_channel() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = ChannelRelay::new(
            Arc::clone(&registry),
            Channel::kinematics(),
            ChannelRole::Producer,
        )
        .with_mirror(Some(Channel::dashboard()));
        let (dash, mut dash_rx) = registry.open_connection();
        registry.add_observer(&Channel::dashboard(), dash).await;

        relay.run_producer(frames(&["k1"])).await;

        assert_eq!(drain(&mut dash_rx), vec![Frame::from("k1")]);
    }

    #[test]
    fn test_mirror_ignores_own_channel() {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = ChannelRelay::new(registry, Channel::dashboard(), ChannelRole::Observer)
            .with_mirror(Some(Channel::dashboard()));

        assert!(relay.mirror().is_none());
        assert_eq!(relay.role(), ChannelRole::Observer);
    }

    fn receiver_stream<T: Send + 'static>(
        rx: mpsc::Receiver<T>,
    ) -> impl Stream<Item = T> + Unpin {
        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }

    async fn wait_until<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }
}

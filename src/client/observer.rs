//! Observer-side relay link

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::registry::{Channel, Frame};

use super::config::ClientConfig;
use super::to_frame;

/// A subscription to one relay channel
pub struct ObserverLink {
    channel: Channel,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ObserverLink {
    /// Subscribe to `channel` on the relay configured in `config`
    pub async fn connect(config: &ClientConfig, channel: Channel) -> Result<Self> {
        let (socket, _) = connect_async(config.observer_url(&channel)).await?;
        tracing::debug!(channel = %channel, "Observing channel");
        Ok(Self { channel, socket })
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Next broadcast frame, or `None` once the relay closes the connection
    pub async fn recv(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Close(_)) => return None,
                Ok(message) => {
                    if let Some(frame) = to_frame(message) {
                        return Some(Ok(frame));
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Next broadcast frame parsed as JSON
    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> Option<Result<T>> {
        let frame = match self.recv().await? {
            Ok(frame) => frame,
            Err(e) => return Some(Err(e)),
        };
        let parsed = match &frame {
            Frame::Text(text) => serde_json::from_str(text),
            Frame::Binary(data) => serde_json::from_slice(data),
        };
        Some(parsed.map_err(Error::from))
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

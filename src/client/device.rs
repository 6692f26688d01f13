//! Device-side relay link

use std::collections::HashMap;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::message::{Command, TelemetryMessage};
use crate::registry::{Channel, DeviceId, Frame};

use super::config::ClientConfig;
use super::{to_frame, to_message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A device's connection set to the relay
///
/// Commands arriving on the command channel are read by a background task
/// and queued for [`next_command`](Self::next_command).
///
/// # Example
/// ```no_run
/// use robot_relay::client::{ClientConfig, DeviceLink};
/// use robot_relay::message::TelemetryMessage;
/// use robot_relay::registry::Channel;
///
/// # async fn example() -> robot_relay::Result<()> {
/// let config = ClientConfig::new("ws://127.0.0.1:8001").device_id("humanoid_001");
/// let mut link = DeviceLink::connect(config).await?;
///
/// link.send(&Channel::telemetry(), &TelemetryMessage::new("telemetry")).await?;
///
/// while let Some(command) = link.next_command().await {
///     println!("Command: {}", command.action);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DeviceLink {
    device_id: DeviceId,
    command_sink: SplitSink<WsStream, Message>,
    producers: HashMap<Channel, WsStream>,
    commands: mpsc::Receiver<Command>,
    reader: JoinHandle<()>,
}

impl DeviceLink {
    /// Open the command channel and every configured producer stream
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let (socket, _) = connect_async(config.telemetry_url()).await?;
        let (command_sink, mut command_stream) = socket.split();
        let (tx, commands) = mpsc::channel(64);

        let device_id = config.device_id.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = command_stream.next().await {
                let frame = match message {
                    Ok(Message::Close(_)) => break,
                    Ok(message) => match to_frame(message) {
                        Some(frame) => frame,
                        None => continue,
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, "Command channel error");
                        break;
                    }
                };

                match Command::decode(&frame) {
                    Ok(command) => {
                        if tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(device_id = %device_id, error = %e, "Ignoring malformed command")
                    }
                }
            }
        });

        let mut producers = HashMap::new();
        for channel in &config.producer_channels {
            let (socket, _) = connect_async(config.producer_url(channel)).await?;
            producers.insert(channel.clone(), socket);
        }

        tracing::info!(
            device_id = %config.device_id,
            producers = producers.len(),
            "Connected to relay"
        );

        Ok(Self {
            device_id: config.device_id,
            command_sink,
            producers,
            commands,
            reader,
        })
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Serialize and send a message on `channel`
    pub async fn send(&mut self, channel: &Channel, message: &TelemetryMessage) -> Result<()> {
        let frame = message.to_frame()?;
        self.send_frame(channel, frame).await
    }

    /// Send a raw frame on `channel`
    ///
    /// The telemetry channel goes over the command link; any other channel
    /// must be one of the configured producer channels.
    pub async fn send_frame(&mut self, channel: &Channel, frame: Frame) -> Result<()> {
        let message = to_message(frame);

        if *channel == Channel::telemetry() {
            self.command_sink.send(message).await?;
            return Ok(());
        }

        let socket = self
            .producers
            .get_mut(channel)
            .ok_or_else(|| Error::ChannelNotConnected(channel.clone()))?;
        socket.send(message).await?;
        Ok(())
    }

    /// Next command addressed to this device
    ///
    /// Returns `None` once the command channel has closed.
    pub async fn next_command(&mut self) -> Option<Command> {
        self.commands.recv().await
    }

    /// Close every connection
    pub async fn close(mut self) -> Result<()> {
        self.command_sink.close().await?;
        for (_, mut socket) in self.producers.drain() {
            socket.close(None).await?;
        }
        self.reader.abort();
        Ok(())
    }
}

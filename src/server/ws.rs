//! WebSocket endpoint handlers
//!
//! Each upgraded socket is split in two. The read half feeds one of the
//! channel pump loops; the write half is owned by a writer task draining the
//! connection's outbound queue, so a slow socket only ever blocks its own
//! queue.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{future, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::{Channel, ConnectionId, DeviceId, Frame};
use crate::relay::{ChannelRole, RelaySummary};
use crate::server::state::RelayState;

/// Query parameters of the device command channel handshake
#[derive(Debug, Default, Deserialize)]
pub struct DeviceParams {
    pub device_id: Option<String>,
}

/// `/ws/telemetry`: the device's bidirectional command/state link
pub async fn device_ws(
    State(state): State<RelayState>,
    Query(params): Query<DeviceParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let permit = match state.admit() {
        Ok(permit) => permit,
        Err(_) => return at_capacity(),
    };
    let device_id = params
        .device_id
        .filter(|id| !id.is_empty())
        .map(DeviceId::from)
        .unwrap_or_else(|| state.config.default_device_id.clone());

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        handle_device(socket, state, device_id).await;
    })
}

/// `/ws/{channel}`: a device-origin broadcast stream
pub async fn producer_ws(
    State(state): State<RelayState>,
    Path(channel): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let channel = Channel::from(channel);
    if !state.config.is_broadcast_channel(&channel) {
        return unknown_channel(&channel);
    }
    let permit = match state.admit() {
        Ok(permit) => permit,
        Err(_) => return at_capacity(),
    };

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        handle_producer(socket, state, channel).await;
    })
}

/// `/ws/dashboard`: observer of the dashboard channel
pub async fn dashboard_ws(State(state): State<RelayState>, ws: WebSocketUpgrade) -> Response {
    observe(state, Channel::dashboard(), ws)
}

/// `/ws/observe/{channel}`: observer of any known channel
pub async fn observer_ws(
    State(state): State<RelayState>,
    Path(channel): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let channel = Channel::from(channel);
    if !state.config.is_observable(&channel) {
        return unknown_channel(&channel);
    }
    observe(state, channel, ws)
}

fn observe(state: RelayState, channel: Channel, ws: WebSocketUpgrade) -> Response {
    let permit = match state.admit() {
        Ok(permit) => permit,
        Err(_) => return at_capacity(),
    };

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        handle_observer(socket, state, channel).await;
    })
}

async fn handle_device(socket: WebSocket, state: RelayState, device_id: DeviceId) {
    let (sink, stream) = socket.split();
    let (handle, outbound) = state.registry.open_connection();
    let connection_id = handle.id();
    let writer = spawn_writer(sink, outbound);

    tracing::info!(device_id = %device_id, connection_id = %connection_id, "Device connected");

    let relay = state.relay(Channel::telemetry(), ChannelRole::DeviceCommand);
    let summary = relay.run_device(device_id.clone(), handle, inbound_frames(stream)).await;
    writer.abort();

    log_closed(&summary, relay.channel(), connection_id);
    tracing::info!(device_id = %device_id, connection_id = %connection_id, "Device disconnected");
}

async fn handle_producer(socket: WebSocket, state: RelayState, channel: Channel) {
    let (_sink, stream) = socket.split();
    let connection_id = state.registry.next_connection_id();

    tracing::info!(channel = %channel, connection_id = %connection_id, "Producer connected");

    let relay = state.relay(channel, ChannelRole::Producer);
    let summary = relay.run_producer(inbound_frames(stream)).await;

    log_closed(&summary, relay.channel(), connection_id);
}

async fn handle_observer(socket: WebSocket, state: RelayState, channel: Channel) {
    let (sink, stream) = socket.split();
    let (handle, outbound) = state.registry.open_connection();
    let connection_id = handle.id();
    let writer = spawn_writer(sink, outbound);

    tracing::info!(channel = %channel, connection_id = %connection_id, "Observer connected");

    let relay = state.relay(channel, ChannelRole::Observer);
    let summary = relay.run_observer(handle, inbound_frames(stream)).await;
    writer.abort();

    log_closed(&summary, relay.channel(), connection_id);
}

fn log_closed(summary: &RelaySummary, channel: &Channel, connection_id: ConnectionId) {
    tracing::debug!(
        channel = %channel,
        connection_id = %connection_id,
        frames = summary.frames,
        errored = summary.errored,
        "Connection closed"
    );
}

/// Data frames read from the socket, ending at the close frame
///
/// Ping and pong are answered by the transport and never surface here.
fn inbound_frames(
    stream: SplitStream<WebSocket>,
) -> impl Stream<Item = Result<Frame, axum::Error>> + Unpin {
    stream
        .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
        .filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(Frame::text(text.as_str()))),
                Ok(Message::Binary(data)) => Some(Ok(Frame::Binary(data))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        })
}

/// Drain the outbound queue into the socket until either side goes away
///
/// Once this task exits the queue's receiver is dropped, so the next
/// delivery to this connection reports it closed.
fn spawn_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Frame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(to_message(frame)).await {
                tracing::debug!(error = %e, "WebSocket write failed");
                break;
            }
        }
        let _ = sink.close().await;
    })
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(String::from(&*text).into()),
        Frame::Binary(data) => Message::Binary(data),
    }
}

fn at_capacity() -> Response {
    tracing::warn!("Connection rejected: limit reached");
    (StatusCode::SERVICE_UNAVAILABLE, "Connection limit reached").into_response()
}

fn unknown_channel(channel: &Channel) -> Response {
    tracing::debug!(channel = %channel, "Rejected unknown channel");
    (StatusCode::NOT_FOUND, format!("Unknown channel: {channel}")).into_response()
}

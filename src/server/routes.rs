//! HTTP routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::command::CommandError;
use crate::message::Command;
use crate::registry::DeviceId;
use crate::server::state::RelayState;
use crate::server::ws;

/// Build the relay's router over `state`
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/devices", get(list_devices))
        .route("/api/stats", get(stats))
        .route("/api/command/{device_id}", post(send_command))
        .route("/ws/telemetry", get(ws::device_ws))
        .route("/ws/dashboard", get(ws::dashboard_ws))
        .route("/ws/observe/{channel}", get(ws::observer_ws))
        .route("/ws/{channel}", get(ws::producer_ws))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_devices(State(state): State<RelayState>) -> Response {
    let devices: Vec<String> = state
        .registry
        .device_ids()
        .await
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    Json(json!({ "devices": devices })).into_response()
}

async fn stats(State(state): State<RelayState>) -> Response {
    Json(state.registry.snapshot().await).into_response()
}

async fn send_command(
    State(state): State<RelayState>,
    Path(device_id): Path<String>,
    Json(command): Json<Command>,
) -> Response {
    let device_id = DeviceId::from(device_id);

    match state.commands.submit(&device_id, &command).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(CommandError::NotConnected(_)) => detail(StatusCode::NOT_FOUND, "Robot not connected"),
        Err(CommandError::DeliveryFailed(_)) => {
            detail(StatusCode::BAD_GATEWAY, "Command delivery failed")
        }
        Err(CommandError::Encode(_)) => detail(StatusCode::BAD_REQUEST, "Command could not be encoded"),
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::server::config::ServerConfig;

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn command_request(device_id: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/command/{device_id}"))
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(RelayState::new(ServerConfig::default()));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_command_to_connected_device() {
        let state = RelayState::new(ServerConfig::default());
        let (handle, mut rx) = state.registry.open_connection();
        state
            .registry
            .register_device(DeviceId::from("humanoid_001"), handle)
            .await;

        let response = router(state)
            .oneshot(command_request("humanoid_001", r#"{"action":"STOP"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"status": "sent", "action": "STOP"})
        );
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.as_text(), Some(r#"{"action":"STOP"}"#));
    }

    #[tokio::test]
    async fn test_command_to_missing_device() {
        let app = router(RelayState::new(ServerConfig::default()));

        let response = app
            .oneshot(command_request("humanoid_001", r#"{"action":"STOP"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Robot not connected"})
        );
    }

    #[tokio::test]
    async fn test_command_delivery_failure() {
        let state = RelayState::new(ServerConfig::default());
        let (handle, rx) = state.registry.open_connection();
        state
            .registry
            .register_device(DeviceId::from("humanoid_001"), handle)
            .await;
        drop(rx);

        let response = router(state.clone())
            .oneshot(command_request("humanoid_001", r#"{"action":"REBOOT"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(state.registry.has_device(&DeviceId::from("humanoid_001")).await);
    }

    #[tokio::test]
    async fn test_command_without_action_is_rejected() {
        let app = router(RelayState::new(ServerConfig::default()));

        let response = app
            .oneshot(command_request("humanoid_001", r#"{"speed":1}"#))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_list_devices_and_stats() {
        let state = RelayState::new(ServerConfig::default());
        let (handle, _rx) = state.registry.open_connection();
        state
            .registry
            .register_device(DeviceId::from("rover_7"), handle)
            .await;

        let response = router(state.clone())
            .oneshot(Request::get("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({"devices": ["rover_7"]}));

        let response = router(state)
            .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["devices"], json!(["rover_7"]));
        assert_eq!(stats["commands_sent"], 0);
    }
}

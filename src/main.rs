//! robot-relay server binary
//!
//! Run with: RUST_LOG=robot_relay=debug robot-relay --bind 0.0.0.0:8001

use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use robot_relay::{Channel, OverflowPolicy, RegistryConfig, RelayServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "robot-relay", version, about = "WebSocket relay between robots and dashboards")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "127.0.0.1:8001")]
    bind: SocketAddr,

    /// Maximum concurrent WebSocket connections (0 = unlimited)
    #[arg(long, env = "RELAY_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Device id used when a device does not send one
    #[arg(long, env = "RELAY_DEVICE_ID", default_value = "humanoid_001")]
    device_id: String,

    /// Device-origin broadcast channels
    #[arg(
        long = "channel",
        env = "RELAY_CHANNELS",
        value_delimiter = ',',
        default_value = "video,kinematics"
    )]
    channels: Vec<String>,

    /// Also broadcast all device traffic on the dashboard channel
    #[arg(long, env = "RELAY_MIRROR_DASHBOARD")]
    mirror_dashboard: bool,

    /// Outbound queue depth per connection
    #[arg(long, env = "RELAY_OUTBOUND_CAPACITY", default_value_t = 256)]
    outbound_capacity: usize,

    /// Drop observers whose outbound queue is full instead of waiting
    #[arg(long, env = "RELAY_DISCONNECT_SLOW_OBSERVERS")]
    disconnect_slow_observers: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let overflow_policy = if self.disconnect_slow_observers {
            OverflowPolicy::Disconnect
        } else {
            OverflowPolicy::Wait
        };

        ServerConfig::with_addr(self.bind)
            .max_connections(self.max_connections)
            .default_device_id(self.device_id)
            .broadcast_channels(self.channels.into_iter().map(Channel::from))
            .mirror_dashboard(self.mirror_dashboard)
            .registry_config(
                RegistryConfig::default()
                    .outbound_capacity(self.outbound_capacity)
                    .overflow_policy(overflow_policy),
            )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("robot_relay=info,tower_http=info")),
        )
        .init();

    let server = RelayServer::new(args.into_config());

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

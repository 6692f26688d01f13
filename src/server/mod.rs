//! Relay server
//!
//! Serves the WebSocket channels and the HTTP control API:
//!
//! | Path                      | Purpose                                  |
//! |---------------------------|------------------------------------------|
//! | `/ws/telemetry`           | Device command/state link (`?device_id=`)|
//! | `/ws/{channel}`           | Device-origin broadcast stream           |
//! | `/ws/dashboard`           | Dashboard observer                       |
//! | `/ws/observe/{channel}`   | Observer of any known channel            |
//! | `POST /api/command/{id}`  | Deliver a command to a device            |
//! | `GET /api/devices`        | Connected device ids                     |
//! | `GET /api/stats`          | Relay counters                           |
//! | `GET /health`             | Liveness                                 |

pub mod config;
pub mod listener;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use listener::RelayServer;
pub use state::RelayState;

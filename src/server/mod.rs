//! The Session Server (§4.4): one WebSocket endpoint, `/ws`, multiplexing
//! independent sessions — one per connection. Everything else is a plain
//! `200 "OK"`.

mod connection;
mod handlers;
pub mod protocol;

use crate::config::AgentConfig;
use crate::provider::ModelAdapter;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<AgentConfig>,
    pub adapter: Arc<dyn ModelAdapter>,
}

pub struct AgentServer {
    state: ServerState,
}

impl AgentServer {
    #[must_use]
    pub fn new(config: Arc<AgentConfig>, adapter: Arc<dyn ModelAdapter>) -> Self {
        Self { state: ServerState { config, adapter } }
    }

    #[must_use]
    pub fn router(self) -> Router {
        Router::new().route("/ws", get(ws_handler)).fallback(fallback).with_state(self.state)
    }

    /// Bind `addr` and serve until the process is asked to shut down.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "session server listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle(socket, state))
}

async fn fallback() -> impl IntoResponse {
    "OK"
}

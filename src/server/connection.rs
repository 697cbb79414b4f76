//! Per-WebSocket-connection lifecycle (§4.4): exactly one `Session` per
//! socket, a serialized write side, and a synchronous-dispatch receive
//! loop that hands long-running work to background tasks.

use super::handlers;
use super::protocol::{ClientMessage, ErrorSource, HelloConfig, ServerEvent};
use super::ServerState;
use crate::session::Session;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Outbound queue depth. Bounded so a stalled client can't grow memory
/// without limit; send_task exits (and the connection closes) if it fills
/// and the receiver is gone.
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub async fn handle(socket: WebSocket, state: ServerState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);

    let session = Arc::new(Mutex::new(Session::new(state.config.clone())));
    let session_id = session.lock().await.session_id.clone();

    send_hello_and_snapshots(&state, &session_id, &tx).await;

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = ws_receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(_) => break,
        };
        match frame {
            Message::Text(text) => handle_text_frame(&text, &session, &session_id, &state, &tx).await,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    {
        let session = session.lock().await;
        session.cancel();
    }
    drop(tx);
    let _ = send_task.await;
}

async fn handle_text_frame(
    text: &str,
    session: &Arc<Mutex<Session>>,
    session_id: &str,
    state: &ServerState,
    tx: &mpsc::Sender<ServerEvent>,
) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let _ = tx
                .send(ServerEvent::Error {
                    session_id: session_id.to_string(),
                    code: "invalid_json".into(),
                    source: ErrorSource::Protocol,
                    message: "Expected object with a string `type`".into(),
                })
                .await;
            return;
        }
    };

    if !value.is_object() {
        let _ = tx
            .send(ServerEvent::Error {
                session_id: session_id.to_string(),
                code: "validation_failed".into(),
                source: ErrorSource::Protocol,
                message: "Expected object with a string `type`".into(),
            })
            .await;
        return;
    }

    let msg: ClientMessage = match serde_json::from_value(value) {
        Ok(msg) => msg,
        Err(e) => {
            let _ = tx
                .send(ServerEvent::Error {
                    session_id: session_id.to_string(),
                    code: "validation_failed".into(),
                    source: ErrorSource::Protocol,
                    message: format!("Expected object… ({e})"),
                })
                .await;
            return;
        }
    };

    if matches!(msg, ClientMessage::Unknown) {
        let _ = tx
            .send(ServerEvent::Error {
                session_id: session_id.to_string(),
                code: "unknown_type".into(),
                source: ErrorSource::Protocol,
                message: "Unknown type…".into(),
            })
            .await;
        return;
    }

    if let Some(offending) = requested_session_id(&msg)
        && offending != session_id
    {
        let _ = tx
            .send(ServerEvent::Error {
                session_id: session_id.to_string(),
                code: "unknown_session".into(),
                source: ErrorSource::Protocol,
                message: format!("Unknown sessionId {offending}"),
            })
            .await;
        return;
    }

    handlers::dispatch(session.clone(), session_id.to_string(), state.clone(), tx.clone(), msg).await;
}

fn requested_session_id(msg: &ClientMessage) -> Option<&str> {
    match msg {
        ClientMessage::UserMessage { session_id, .. }
        | ClientMessage::Cancel { session_id }
        | ClientMessage::Reset { session_id } => session_id.as_deref(),
        _ => None,
    }
}

async fn send_hello_and_snapshots(state: &ServerState, session_id: &str, tx: &mpsc::Sender<ServerEvent>) {
    let _ = tx
        .send(ServerEvent::ServerHello {
            session_id: session_id.to_string(),
            protocol_version: 1,
            config: HelloConfig {
                provider: state.config.provider.clone(),
                model: state.config.model.clone(),
                working_directory: state.config.working_directory.display().to_string(),
                output_directory: state.config.output_directory.display().to_string(),
            },
        })
        .await;
    let _ = tx
        .send(ServerEvent::SessionSettings {
            session_id: session_id.to_string(),
            harness_mode: format!("{:?}", state.config.harness_mode),
        })
        .await;
    let _ = tx
        .send(ServerEvent::ObservabilityStatus {
            session_id: session_id.to_string(),
            enabled: crate::observability::enabled(),
        })
        .await;
    let _ = tx
        .send(ServerEvent::ProviderCatalog {
            session_id: session_id.to_string(),
            providers: vec!["anthropic".into(), "openai".into(), "openrouter".into(), "google".into(), "groq".into()],
        })
        .await;
    let _ = tx
        .send(ServerEvent::ProviderAuthMethods {
            session_id: session_id.to_string(),
            methods: vec!["api_key".into()],
        })
        .await;
    let _ = tx
        .send(ServerEvent::ProviderStatus {
            session_id: session_id.to_string(),
            provider: state.config.provider.clone(),
            model: state.config.model.clone(),
        })
        .await;
}

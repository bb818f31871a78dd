//! WebSocket transport
//!
//! This file implements the relay's listener and per-connection handler.
//! Responsibilities:
//! - Serve HTTP on the relay port: upgrade WebSocket requests on any path,
//!   answer everything else with a plain `okay`
//! - Register a `Client` with the broker before the first frame is read
//! - Decode inbound JSON frames and hand them to the broker
//! - Ping the peer every period and evict it after a missed pong
//! - Release every subscription when the connection ends, on any path

use std::time::Duration;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::broker::{SharedBroker, lock};
use crate::client::{Client, ConnectionId, Heartbeat, HeartbeatAction};
use crate::config::Settings;
use crate::transport::message::{ClientMessage, DecodeError};
use crate::utils::RelayError;

/// How long the writer gets to flush the close frame once the connection
/// is torn down.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Shared state for the relay's HTTP handlers
#[derive(Clone)]
pub struct RelayState {
    pub broker: SharedBroker,
    pub ping_interval: Duration,
}

/// Build the relay router. Peers may connect on any path, so the upgrade
/// handler sits in the fallback rather than on a fixed route.
pub fn create_router(broker: SharedBroker, settings: &Settings) -> Router {
    let state = RelayState {
        broker,
        ping_interval: settings.relay.ping_interval(),
    };
    Router::new()
        .route("/health", get(health_handler))
        .fallback(relay_handler)
        .with_state(state)
}

pub async fn start_websocket_server(
    addr: &str,
    broker: SharedBroker,
    settings: Settings,
) -> Result<(), RelayError> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, broker, settings).await
}

/// Serve the relay on an already bound listener until it fails.
pub async fn serve(
    listener: TcpListener,
    broker: SharedBroker,
    settings: Settings,
) -> Result<(), RelayError> {
    let app = create_router(broker, &settings);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> &'static str {
    "okay"
}

async fn relay_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<RelayState>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .on_failed_upgrade(|e| debug!("WebSocket handshake failed: {e}"))
            .on_upgrade(move |socket| handle_connection(socket, state.broker, state.ping_interval))
            .into_response(),
        Err(_) => health_handler().await.into_response(),
    }
}

/// Closes the connection in the broker when dropped, so subscriptions are
/// released however the handler exits.
struct CloseGuard {
    broker: SharedBroker,
    id: ConnectionId,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        lock(&self.broker).close_client(&self.id);
    }
}

/// Drive one upgraded socket until the peer leaves, a transport error
/// occurs, the heartbeat expires, or the broker closes it.
pub async fn handle_connection(socket: WebSocket, broker: SharedBroker, ping_interval: Duration) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let client = Client::new(tx);
    let shutdown = client.shutdown_signal();
    let client_id = lock(&broker).register_client(client);
    let guard = CloseGuard {
        broker: broker.clone(),
        id: client_id,
    };
    info!("{client_id} connected");

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, WsMessage::Close(_));
            if let Err(e) = ws_sender.send(msg).await {
                debug!("Failed to send frame to {client_id}: {e}");
                break;
            }
            if closing {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut heartbeat = Heartbeat::new();
    let mut ticker = time::interval_at(Instant::now() + ping_interval, ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    dispatch(&broker, client_id, ClientMessage::decode(text.as_str()));
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    dispatch(&broker, client_id, ClientMessage::decode_slice(&data));
                }
                Some(Ok(WsMessage::Pong(_))) => heartbeat.pong(),
                // answered by the websocket layer
                Some(Ok(WsMessage::Ping(_))) => {}
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Transport error on {client_id}: {e}");
                    break;
                }
            },
            _ = ticker.tick() => match heartbeat.tick() {
                HeartbeatAction::Expire => {
                    info!("{client_id} missed a heartbeat, closing");
                    break;
                }
                HeartbeatAction::SendPing => {
                    let ping = WsMessage::Ping(Default::default());
                    if !lock(&broker).deliver(client_id, ping) {
                        break;
                    }
                }
            },
            _ = shutdown.notified() => break,
        }
    }

    drop(guard);

    let abort = writer.abort_handle();
    if time::timeout(CLOSE_GRACE, writer).await.is_err() {
        abort.abort();
    }
    debug!("Handler for {client_id} finished");
}

fn dispatch(broker: &SharedBroker, id: ConnectionId, decoded: Result<ClientMessage, DecodeError>) {
    match decoded {
        Ok(msg) => lock(broker).handle(id, msg),
        Err(e) => debug!("Dropping frame from {id}: {e}"),
    }
}

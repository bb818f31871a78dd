//! CLI for signal-relay
//!
//! Subcommands:
//! - `server`: run the relay
//! - `client`: run a small smoke-test peer against a running relay

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use signal_relay::{Broker, RelayError, load_config, start_websocket_server};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "signal-relay", version, about)]
enum Command {
    /// Start the relay
    Server,
    /// Subscribe to a topic, ping, publish one frame and print the replies
    Client {
        /// Relay URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:4444")]
        url: String,
        /// Topic to join and publish to
        #[arg(long, default_value = "smoke-test")]
        topic: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let result = match cmd {
        Command::Server => run_server().await,
        Command::Client { url, topic } => {
            signal_relay::utils::logging::init("info");
            run_client(&url, &topic).await
        }
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), RelayError> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            signal_relay::utils::logging::init("info");
            return Err(e.into());
        }
    };
    signal_relay::utils::logging::init(&config.log.level);

    let addr = config.server.addr();
    let broker = Broker::with_policy(config.relay.self_delivery).shared();
    info!(
        "Heartbeat every {:?}, self delivery: {:?}",
        config.relay.ping_interval(),
        config.relay.self_delivery
    );

    tokio::select! {
        res = start_websocket_server(&addr, broker, config) => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(url: &str, topic: &str) -> Result<(), RelayError> {
    let (mut ws_stream, _response) = connect_async(url).await?;

    let frames = [
        json!({ "type": "subscribe", "topics": [topic] }),
        json!({ "type": "ping" }),
        json!({ "type": "publish", "topic": topic, "data": "hello from signal-relay" }),
    ];
    for frame in frames {
        ws_stream
            .send(WsMessage::Text(frame.to_string().into()))
            .await?;
    }

    // The publish is not echoed back by default, so expect the pong and
    // whatever other peers on the topic send.
    while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_secs(2), ws_stream.next()).await {
        match msg? {
            WsMessage::Text(text) => println!("Incoming: {}", text.as_str()),
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    let _ = ws_stream.close(None).await;
    Ok(())
}

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use shared::protocol::{ClientFrame, KeyPhase, RoleHint, ServerFrame};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "ws://127.0.0.1:8079/ws")]
    url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register as an actuator and print every command received.
    Listen {
        #[arg(long, default_value = "exe")]
        role: String,
    },
    /// Register as a controller and send a single input event.
    Send {
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "KEY_PRESS")]
        event: String,
        #[arg(long)]
        mode: Option<String>,
        /// How long to keep the connection open after sending.
        #[arg(long, default_value_t = 200)]
        linger_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let (ws, _) = connect_async(cli.url.as_str())
        .await
        .with_context(|| format!("failed to connect websocket: {}", cli.url))?;
    let (mut writer, mut reader) = ws.split();
    info!(url = %cli.url, "connected");

    match cli.command {
        Command::Listen { role } => {
            let register = ClientFrame::Register(RoleHint::Legacy(role));
            writer
                .send(Message::Text(serde_json::to_string(&register)?))
                .await?;

            while let Some(msg) = reader.next().await {
                match msg? {
                    Message::Text(text) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(ServerFrame::Control(command)) => println!(
                            "{:?} key={} mode={}",
                            command.action, command.key, command.mode
                        ),
                        Err(error) => warn!(%error, %text, "unexpected frame"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
        Command::Send {
            key,
            event,
            mode,
            linger_ms,
        } => {
            if KeyPhase::parse(&event).is_none() {
                warn!(%event, "relay will drop this phase");
            }

            let register = ClientFrame::Register(RoleHint::structured("android_controller"));
            writer
                .send(Message::Text(serde_json::to_string(&register)?))
                .await?;

            let mut data = json!({ "type": "INPUT", "key": key, "event": event });
            if let Some(mode) = mode {
                data["mode"] = json!(mode);
            }
            let control = ClientFrame::AndroidControl(data);
            writer
                .send(Message::Text(serde_json::to_string(&control)?))
                .await?;
            println!("sent {}", serde_json::to_string(&control)?);

            tokio::time::sleep(Duration::from_millis(linger_ms)).await;
            writer.send(Message::Close(None)).await?;
        }
    }

    Ok(())
}

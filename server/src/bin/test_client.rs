//! Headless bot that joins an arena server and wanders around.
//!
//! Useful for smoke-testing a running server or putting a few extra
//! players in the arena while developing a client.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use shared::{PlayerControl, SocketMessage, DEFAULT_PORT};
use std::time::Duration;
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server host to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// How long to stay connected, in seconds
    #[clap(short, long, default_value_t = 10)]
    duration: u64,
    /// Milliseconds between control changes
    #[clap(short, long, default_value_t = 500)]
    steer_ms: u64,
}

fn random_controls(rng: &mut impl rand::Rng) -> Vec<PlayerControl> {
    let horizontal = [None, Some(PlayerControl::Left), Some(PlayerControl::Right)];
    let vertical = [None, Some(PlayerControl::Up), Some(PlayerControl::Down)];

    [horizontal.choose(rng), vertical.choose(rng)]
        .into_iter()
        .flatten()
        .flatten()
        .copied()
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let url = format!("ws://{}:{}", args.host, args.port);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    info!("Connected to {}", url);

    let mut rng = rand::thread_rng();
    let mut steer = interval(Duration::from_millis(args.steer_ms.max(1)));
    let deadline = sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);

    let mut player_id = None;
    let mut updates = 0u64;

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Connection error: {}", e);
                        break;
                    }
                };

                match serde_json::from_str::<SocketMessage>(&text) {
                    Ok(SocketMessage::GameJoinUpdate { player_id: id, players, .. }) => {
                        info!("Joined as player {} with {} player(s) in the arena", id, players.len());
                        player_id = Some(id);
                    }
                    Ok(SocketMessage::GameUpdate { server_age, players }) => {
                        updates += 1;
                        let me = players.iter().find(|p| Some(&p.id) == player_id.as_ref());
                        if let Some(me) = me {
                            debug!("t={}s at ({}, {})", server_age, me.x, me.y);
                        }
                    }
                    Ok(SocketMessage::GameOverUpdate { reason }) => {
                        info!("Game over: {}", reason);
                    }
                    Ok(SocketMessage::ServerError { message }) => warn!("Server error: {}", message),
                    Ok(other) => debug!("Ignoring {:?}", other),
                    Err(e) => warn!("Unreadable message from server: {}", e),
                }
            },

            _ = steer.tick() => {
                let controls = random_controls(&mut rng);
                let update = SocketMessage::PlayerControlUpdate { pressed_controls: controls };
                ws_sender.send(Message::text(serde_json::to_string(&update)?)).await?;
            },

            _ = &mut deadline => {
                info!("Done after {}s", args.duration);
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            },
        }
    }

    info!("Received {} game updates", updates);
    Ok(())
}

use clap::Parser;
use log::info;
use server::config::{Arena, ServerConfig};
use server::network::Server;
use shared::{
    ARENA_HEIGHT, ARENA_WIDTH, DEFAULT_PORT, IDLE_TIMEOUT_SECS, PLAYER_HEIGHT, PLAYER_SPEED,
    PLAYER_WIDTH, TICK_RATE, TIME_LIMIT_SECS,
};
use std::time::Duration;

/// Command line arguments. Every option can also come from the environment.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(
        short,
        long,
        env = "TICK_RATE",
        default_value_t = TICK_RATE,
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    tick_rate: u32,
    /// Seconds a game session may last
    #[clap(long, env = "TIME_LIMIT", default_value_t = TIME_LIMIT_SECS)]
    time_limit: u64,
    /// Seconds without connections before the server shuts down
    #[clap(long, env = "IDLE_TIMEOUT", default_value_t = IDLE_TIMEOUT_SECS)]
    idle_timeout: u64,
    #[clap(long, env = "ARENA_WIDTH", default_value_t = ARENA_WIDTH)]
    arena_width: u32,
    #[clap(long, env = "ARENA_HEIGHT", default_value_t = ARENA_HEIGHT)]
    arena_height: u32,
    #[clap(long, env = "PLAYER_WIDTH", default_value_t = PLAYER_WIDTH)]
    player_width: u32,
    #[clap(long, env = "PLAYER_HEIGHT", default_value_t = PLAYER_HEIGHT)]
    player_height: u32,
    /// Pixels moved per tick while a control is held
    #[clap(long, env = "PLAYER_SPEED", default_value_t = PLAYER_SPEED)]
    speed: i32,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            tick_rate: args.tick_rate,
            time_limit: Duration::from_secs(args.time_limit),
            idle_timeout: Duration::from_secs(args.idle_timeout),
            arena: Arena {
                width: args.arena_width,
                height: args.arena_height,
                player_width: args.player_width,
                player_height: args.player_height,
                speed: args.speed,
            },
        }
    }
}

/// Parses command-line arguments, binds the server and runs it until it
/// goes idle or receives Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());
    info!(
        "Arena {}x{}, {} ticks/s, session limit {:?}, idle timeout {:?}",
        config.arena.width,
        config.arena.height,
        config.tick_rate,
        config.time_limit,
        config.idle_timeout
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

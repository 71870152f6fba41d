//! Plays automated matches between two random bots against a running server.

use anyhow::Result;
use clap::Parser;
use noughts_client::{GameClient, Table, Tally};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Two random bots play tic-tac-toe against a noughts server")]
struct Args {
    /// Server WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Number of matches to play
    #[arg(short, long, default_value = "10")]
    games: u32,

    /// Room to play in (random if omitted)
    #[arg(short, long)]
    room: Option<String>,

    /// RNG seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let room = args
        .room
        .clone()
        .unwrap_or_else(|| format!("sim-{:06}", rng.gen_range(0..1_000_000)));

    info!("🚀 Starting simulation");
    info!("   • Server: {}", args.url);
    info!("   • Room: {}", room);
    info!("   • Matches: {}", args.games);

    let mut first = GameClient::connect(&args.url).await?;
    first.hello("bot-x").await?;
    let mut second = GameClient::connect(&args.url).await?;
    second.hello("bot-o").await?;

    let mut table = Table::seat(&room, first, second).await?;
    let mut tally = Tally::default();

    for game in 0..args.games {
        let result = if game == 0 {
            table.play_first(&mut rng).await
        } else {
            table.play_rematch(&mut rng).await
        };
        match result {
            Ok(winner) => tally.record(winner),
            Err(e) => {
                warn!("⚠️ Match {} aborted: {:#}", game + 1, e);
                break;
            }
        }
    }

    table.leave().await?;

    info!("✅ Simulation complete after {} matches", tally.games());
    info!("   • X wins: {}", tally.x_wins);
    info!("   • O wins: {}", tally.o_wins);
    info!("   • Draws: {}", tally.draws);
    Ok(())
}

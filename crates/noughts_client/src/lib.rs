//! # Noughts Client
//!
//! A small async client for the noughts WebSocket protocol, plus the random
//! bots behind the `simulate` binary.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use noughts_client::GameClient;
//!
//! let mut client = GameClient::connect("ws://127.0.0.1:8080").await?;
//! client.hello("ann").await?;
//! let receipt = client.join_room("den").await?;
//! println!("playing as {}", receipt.symbol);
//! # Ok(())
//! # }
//! ```

pub mod bots;
pub mod client;

pub use bots::{Table, Tally};
pub use client::{GameClient, Response};

#[cfg(test)]
mod tests {
    use super::*;
    use game_server::{create_server_with_config, ServerConfig};
    use noughts_core::{ServerEvent, Status, Symbol};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::Arc;

    async fn spawn_server() -> String {
        let config = ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let server = Arc::new(create_server_with_config(config));
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server.serve(listener).await });
        format!("ws://{addr}")
    }

    async fn player(url: &str, name: &str) -> GameClient {
        let mut client = GameClient::connect(url).await.unwrap();
        client.hello(name).await.unwrap();
        client
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_queues_pushes() {
        let url = spawn_server().await;
        let mut ann = player(&url, "ann").await;
        let mut bob = player(&url, "bob").await;

        assert_eq!(ann.display_name().map(|n| n.as_str()), Some("ann"));
        assert!(ann.connection_id().is_some());
        assert!(ann.list_rooms().await.unwrap().is_empty());

        let receipt = ann.join_room("den").await.unwrap();
        assert_eq!(receipt.symbol, Symbol::X);
        assert_eq!(bob.list_rooms().await.unwrap(), vec!["den".to_string()]);
        bob.join_room("den").await.unwrap();

        // Refusals are responses, not errors.
        let response = bob.make_move("den", 0, 0).await.unwrap();
        assert_eq!(response.status, Status::NoActiveMatch);

        let ping = ann.request("system", "ping", json!(null)).await.unwrap();
        assert_eq!(ping.status, Status::Ok);
        match ann.next_event().await.unwrap() {
            Some(ServerEvent::OpponentJoined { display_name }) => {
                assert_eq!(display_name.as_str(), "bob")
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(ann.next_event().await.unwrap(), Some(ServerEvent::Pong));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hello_rejection_is_an_error() {
        let url = spawn_server().await;
        let mut client = GameClient::connect(&url).await.unwrap();
        let err = client.hello("   ").await.unwrap_err();
        assert!(err.to_string().contains("InvalidName"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bots_play_and_rematch() {
        let url = spawn_server().await;
        let mut rng = StdRng::seed_from_u64(42);
        let (bot_x, bot_o) = (player(&url, "bot-x").await, player(&url, "bot-o").await);
        let mut table = Table::seat("arena", bot_x, bot_o).await.unwrap();

        let mut tally = Tally::default();
        tally.record(table.play_first(&mut rng).await.unwrap());
        for _ in 0..2 {
            tally.record(table.play_rematch(&mut rng).await.unwrap());
        }

        assert_eq!(tally.games(), 3);
        table.leave().await.unwrap();
    }
}

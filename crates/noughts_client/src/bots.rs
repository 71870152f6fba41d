//! Random-move bots used by the `simulate` binary.

use crate::client::GameClient;
use anyhow::{bail, Context, Result};
use noughts_core::{ServerEvent, Snapshot, Symbol, BOARD_SIZE};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

/// Results across all simulated matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
}

impl Tally {
    pub fn record(&mut self, winner: Option<Symbol>) {
        match winner {
            Some(Symbol::X) => self.x_wins += 1,
            Some(Symbol::O) => self.o_wins += 1,
            None => self.draws += 1,
        }
    }

    pub fn games(&self) -> u32 {
        self.x_wins + self.o_wins + self.draws
    }
}

/// Two seated clients sharing one room.
pub struct Table {
    pub room_id: String,
    x: GameClient,
    o: GameClient,
}

impl Table {
    /// Seats `first` and `second` in `room_id`; `first` must end up as `X`.
    pub async fn seat(
        room_id: &str,
        mut first: GameClient,
        mut second: GameClient,
    ) -> Result<Self> {
        let receipt = first.join_room(room_id).await.context("first player joining")?;
        if receipt.symbol != Symbol::X {
            bail!("room {room_id} was not empty");
        }
        second.join_room(room_id).await.context("second player joining")?;

        Ok(Self {
            room_id: room_id.to_string(),
            x: first,
            o: second,
        })
    }

    /// Starts the first match and plays it to the end.
    pub async fn play_first(&mut self, rng: &mut impl Rng) -> Result<Option<Symbol>> {
        self.x.start_match(&self.room_id).await?;
        self.play(rng).await
    }

    /// Both players vote for a rematch, then the new match is played out.
    pub async fn play_rematch(&mut self, rng: &mut impl Rng) -> Result<Option<Symbol>> {
        if self.x.rematch(&self.room_id).await? {
            bail!("rematch restarted on a single vote");
        }
        if !self.o.rematch(&self.room_id).await? {
            bail!("second rematch vote did not restart the match");
        }
        self.play(rng).await
    }

    /// Plays random legal moves until the match ends, returning the winner.
    async fn play(&mut self, rng: &mut impl Rng) -> Result<Option<Symbol>> {
        let mut snapshot = self.x.next_snapshot().await?;
        self.o.next_snapshot().await?;

        while !snapshot.is_terminal() {
            let (row, col) =
                random_free_cell(&snapshot, rng).context("board full but not terminal")?;
            let mover = match snapshot.current_turn {
                Symbol::X => &mut self.x,
                Symbol::O => &mut self.o,
            };
            let response = mover.make_move(&self.room_id, row, col).await?;
            response.ok().with_context(|| format!("move ({row}, {col}) refused"))?;
            debug!("🎯 {} plays ({}, {})", snapshot.current_turn, row, col);

            // Both players see every accepted move.
            snapshot = self.x.next_snapshot().await?;
            let mirrored = self.o.next_snapshot().await?;
            if mirrored != snapshot {
                bail!("players disagree about the board after move {}", snapshot.move_count);
            }
        }

        let closing = match snapshot.winner {
            Some(_) => "gg",
            None => "draw!",
        };
        self.o.chat(closing).await?.ok()?;
        for player in [&mut self.x, &mut self.o] {
            player
                .wait_for(|event| matches!(event, ServerEvent::ChatMessage { .. }).then_some(()))
                .await?;
        }

        info!(
            "🏁 Room {} finished in {} moves: {}",
            self.room_id,
            snapshot.move_count,
            snapshot.winner.map_or_else(|| "draw".to_string(), |s| format!("{s} wins"))
        );
        Ok(snapshot.winner)
    }

    /// Closes both connections.
    pub async fn leave(self) -> Result<()> {
        self.x.close().await?;
        self.o.close().await
    }
}

fn random_free_cell(snapshot: &Snapshot, rng: &mut impl Rng) -> Option<(usize, usize)> {
    let free: Vec<(usize, usize)> = (0..BOARD_SIZE)
        .flat_map(|row| (0..BOARD_SIZE).map(move |col| (row, col)))
        .filter(|&(row, col)| snapshot.board[row][col].is_none())
        .collect();
    free.choose(rng).copied()
}

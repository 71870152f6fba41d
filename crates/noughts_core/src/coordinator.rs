//! Match coordinator: binds rooms to engine instances.
//!
//! Owns every [`TicTacToe`] match by room id along with the per-room rematch
//! votes. Votes are a set of connection ids, so a player asking twice still
//! counts once. Any path that starts a match clears the room's votes.

use crate::engine::{MoveOutcome, Snapshot, TicTacToe};
use crate::error::LobbyError;
use crate::events::{Outbox, ServerEvent};
use crate::registry::ROOM_CAPACITY;
use crate::types::{ConnectionId, DisplayName, RoomId, Symbol};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Result of a rematch vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RematchOutcome {
    /// Vote recorded; waiting on the other player.
    Pending,
    /// Both players voted and the match was reset.
    Restarted(Snapshot),
}

#[derive(Debug, Default)]
pub struct MatchCoordinator {
    matches: HashMap<RoomId, TicTacToe>,
    votes: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl MatchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or resets) the match for `room` and broadcasts `match_started`.
    ///
    /// # Arguments
    ///
    /// * `room` - Room whose match to start
    /// * `members` - Connections currently seated in the room
    /// * `outbox` - Receives one `match_started` per member
    ///
    /// # Errors
    ///
    /// * [`LobbyError::RoomNotReady`] with fewer than two members
    /// * [`LobbyError::AlreadyStarted`] while a non-terminal match exists
    pub fn start_match(
        &mut self,
        room: &RoomId,
        members: &[ConnectionId],
        outbox: &mut Outbox,
    ) -> Result<Snapshot, LobbyError> {
        if members.len() < ROOM_CAPACITY {
            return Err(LobbyError::RoomNotReady(room.to_string()));
        }
        if self.matches.get(room).is_some_and(|game| !game.is_terminal()) {
            return Err(LobbyError::AlreadyStarted(room.to_string()));
        }
        Ok(self.restart(room, members, outbox))
    }

    fn restart(
        &mut self,
        room: &RoomId,
        members: &[ConnectionId],
        outbox: &mut Outbox,
    ) -> Snapshot {
        let game = self.matches.entry(room.clone()).or_default();
        game.reset();
        self.votes.remove(room);

        let snapshot = game.snapshot();
        outbox.broadcast(members.iter().copied(), ServerEvent::MatchStarted(snapshot.clone()));
        debug!("🎲 Match started in room {}", room);
        snapshot
    }

    /// Applies a move for the player holding `symbol`.
    ///
    /// Rejected moves come back as errors and produce no broadcast. Accepted
    /// moves push `move_made` with the new snapshot to every member.
    pub fn submit_move(
        &mut self,
        room: &RoomId,
        symbol: Symbol,
        row: i64,
        col: i64,
        members: &[ConnectionId],
        outbox: &mut Outbox,
    ) -> Result<MoveOutcome, LobbyError> {
        let game = self
            .matches
            .get_mut(room)
            .ok_or_else(|| LobbyError::NoActiveMatch(room.to_string()))?;

        let outcome = game.make_move(symbol, row, col);
        match outcome {
            MoveOutcome::WrongTurn => Err(LobbyError::WrongTurn),
            MoveOutcome::InvalidCell => Err(LobbyError::InvalidCell { row, col }),
            MoveOutcome::GameOver => Err(LobbyError::GameOver),
            MoveOutcome::MoveAccepted
            | MoveOutcome::MoveAcceptedWin
            | MoveOutcome::MoveAcceptedDraw => {
                outbox.broadcast(members.iter().copied(), ServerEvent::MoveMade(game.snapshot()));
                Ok(outcome)
            }
        }
    }

    /// Records a rematch vote from `voter`.
    ///
    /// When every seated member has voted the match resets in place and
    /// `match_started` goes out; otherwise the room is told who asked.
    pub fn request_rematch(
        &mut self,
        room: &RoomId,
        voter: ConnectionId,
        voter_name: &DisplayName,
        members: &[ConnectionId],
        outbox: &mut Outbox,
    ) -> Result<RematchOutcome, LobbyError> {
        let game = self
            .matches
            .get(room)
            .ok_or_else(|| LobbyError::NoActiveMatch(room.to_string()))?;
        if !game.is_terminal() {
            return Err(LobbyError::AlreadyStarted(room.to_string()));
        }

        let votes = self.votes.entry(room.clone()).or_default();
        votes.insert(voter);
        // Votes from members who left no longer count.
        votes.retain(|id| members.contains(id));

        if votes.len() >= ROOM_CAPACITY {
            let snapshot = self.start_match(room, members, outbox)?;
            return Ok(RematchOutcome::Restarted(snapshot));
        }

        outbox.broadcast(
            members.iter().copied(),
            ServerEvent::RematchRequested {
                display_name: voter_name.clone(),
            },
        );
        Ok(RematchOutcome::Pending)
    }

    /// Current snapshot for `room`, if a match exists.
    pub fn snapshot(&self, room: &RoomId) -> Option<Snapshot> {
        self.matches.get(room).map(TicTacToe::snapshot)
    }

    /// Drops the match and any votes for `room`. Returns whether a match existed.
    pub fn remove(&mut self, room: &RoomId) -> bool {
        self.votes.remove(room);
        self.matches.remove(room).is_some()
    }

    pub fn pending_votes(&self, room: &RoomId) -> usize {
        self.votes.get(room).map_or(0, BTreeSet::len)
    }

    /// Matches still in play.
    pub fn active_count(&self) -> usize {
        self.matches.values().filter(|game| !game.is_terminal()).count()
    }

    pub fn clear(&mut self) {
        self.matches.clear();
        self.votes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);

    fn room() -> RoomId {
        RoomId::parse("arena").unwrap()
    }

    fn name(raw: &str) -> DisplayName {
        DisplayName::parse(raw).unwrap()
    }

    /// Plays X across the top row to finish a match.
    fn finish(coordinator: &mut MatchCoordinator, outbox: &mut Outbox) {
        let moves = [
            (Symbol::X, 0, 0),
            (Symbol::O, 1, 1),
            (Symbol::X, 0, 1),
            (Symbol::O, 2, 0),
            (Symbol::X, 0, 2),
        ];
        for (symbol, row, col) in moves {
            coordinator
                .submit_move(&room(), symbol, row, col, &[A, B], outbox)
                .unwrap();
        }
    }

    #[test]
    fn start_requires_two_members() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        assert_eq!(
            coordinator.start_match(&room(), &[A], &mut outbox),
            Err(LobbyError::RoomNotReady("arena".into()))
        );
        assert!(outbox.is_empty());
    }

    #[test]
    fn start_broadcasts_and_rejects_second_start() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        let snapshot = coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        assert_eq!(snapshot.move_count, 0);
        assert_eq!(outbox.len(), 2);
        assert_eq!(
            coordinator.start_match(&room(), &[A, B], &mut outbox),
            Err(LobbyError::AlreadyStarted("arena".into()))
        );
        assert_eq!(coordinator.active_count(), 1);
    }

    #[test]
    fn rejected_moves_do_not_broadcast() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        let mut outbox = Outbox::new();

        let wrong = coordinator.submit_move(&room(), Symbol::O, 0, 0, &[A, B], &mut outbox);
        assert_eq!(wrong, Err(LobbyError::WrongTurn));
        let off_board = coordinator.submit_move(&room(), Symbol::X, 5, 0, &[A, B], &mut outbox);
        assert_eq!(off_board, Err(LobbyError::InvalidCell { row: 5, col: 0 }));
        assert!(outbox.is_empty());

        let ok = coordinator.submit_move(&room(), Symbol::X, 1, 1, &[A, B], &mut outbox);
        assert_eq!(ok, Ok(MoveOutcome::MoveAccepted));
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn move_without_match_fails() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        assert_eq!(
            coordinator.submit_move(&room(), Symbol::X, 0, 0, &[A, B], &mut outbox),
            Err(LobbyError::NoActiveMatch("arena".into()))
        );
    }

    #[test]
    fn rematch_needs_two_distinct_votes() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        finish(&mut coordinator, &mut outbox);

        let mut outbox = Outbox::new();
        let first = coordinator.request_rematch(&room(), A, &name("ann"), &[A, B], &mut outbox);
        assert_eq!(first, Ok(RematchOutcome::Pending));
        let repeat = coordinator.request_rematch(&room(), A, &name("ann"), &[A, B], &mut outbox);
        assert_eq!(repeat, Ok(RematchOutcome::Pending));
        assert_eq!(coordinator.pending_votes(&room()), 1);
        assert_eq!(coordinator.snapshot(&room()).unwrap().winner, Some(Symbol::X));

        let second = coordinator
            .request_rematch(&room(), B, &name("bob"), &[A, B], &mut outbox)
            .unwrap();
        let RematchOutcome::Restarted(snapshot) = second else {
            panic!("expected restart");
        };
        assert_eq!(snapshot, TicTacToe::new().snapshot());
        assert_eq!(coordinator.pending_votes(&room()), 0);
    }

    #[test]
    fn manual_start_clears_pending_votes() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        finish(&mut coordinator, &mut outbox);
        let pending = coordinator.request_rematch(&room(), A, &name("ann"), &[A, B], &mut outbox);
        assert_eq!(pending, Ok(RematchOutcome::Pending));
        assert_eq!(coordinator.pending_votes(&room()), 1);

        // A finished match may be restarted directly, bypassing the vote.
        let fresh = coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        assert_eq!(fresh, TicTacToe::new().snapshot());
        assert_eq!(coordinator.pending_votes(&room()), 0);

        // Ann's old vote must not combine with Bob's new one.
        finish(&mut coordinator, &mut outbox);
        let mut outbox = Outbox::new();
        let single = coordinator.request_rematch(&room(), B, &name("bob"), &[A, B], &mut outbox);
        assert_eq!(single, Ok(RematchOutcome::Pending));
        assert_eq!(coordinator.pending_votes(&room()), 1);
        assert!(coordinator.snapshot(&room()).unwrap().is_terminal());
        assert!(outbox
            .envelopes()
            .iter()
            .all(|e| matches!(e.event, ServerEvent::RematchRequested { .. })));
    }

    #[test]
    fn rematch_during_play_is_rejected() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        assert_eq!(
            coordinator.request_rematch(&room(), A, &name("ann"), &[A, B], &mut outbox),
            Err(LobbyError::AlreadyStarted("arena".into()))
        );
    }

    #[test]
    fn remove_drops_match_and_votes() {
        let mut coordinator = MatchCoordinator::new();
        let mut outbox = Outbox::new();
        coordinator.start_match(&room(), &[A, B], &mut outbox).unwrap();
        finish(&mut coordinator, &mut outbox);
        coordinator
            .request_rematch(&room(), A, &name("ann"), &[A, B], &mut outbox)
            .unwrap();

        assert!(coordinator.remove(&room()));
        assert!(!coordinator.remove(&room()));
        assert_eq!(coordinator.pending_votes(&room()), 0);
        assert!(coordinator.snapshot(&room()).is_none());
    }
}

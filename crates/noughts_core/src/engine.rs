//! Rules engine for a single tic-tac-toe match.
//!
//! [`TicTacToe`] is a pure, deterministic state machine: a 3×3 board, whose
//! turn it is, how many moves have been made and who (if anyone) won. It
//! knows nothing about rooms, sessions or the network. Rejected moves never
//! mutate state.
//!
//! Invariants held after every call:
//! * `move_count` equals the number of occupied cells.
//! * `winner` is set only if a winning line exists on the board.
//! * once terminal (winner set or nine moves made) no move is accepted until
//!   [`TicTacToe::reset`].

use crate::types::Symbol;
use serde::{Deserialize, Serialize};

/// Board side length.
pub const BOARD_SIZE: usize = 3;

/// Fewest total moves that can produce a line (X moves on turns 1, 3 and 5).
const MIN_MOVES_FOR_WIN: u8 = 5;

/// Total number of cells.
const MAX_MOVES: u8 = (BOARD_SIZE * BOARD_SIZE) as u8;

/// Every line that wins: three rows, three columns, two diagonals.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Cell contents; `None` is empty.
pub type Board = [[Option<Symbol>; BOARD_SIZE]; BOARD_SIZE];

/// Result of [`TicTacToe::make_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveOutcome {
    /// Symbol is not the one whose turn it is. Nothing changed.
    WrongTurn,
    /// Row/column out of range or the cell is occupied. Nothing changed.
    InvalidCell,
    /// The match is already terminal. Nothing changed.
    GameOver,
    /// Move applied; play continues with the other symbol.
    MoveAccepted,
    /// Move applied and completed a line.
    MoveAcceptedWin,
    /// Move applied, board full, no line.
    MoveAcceptedDraw,
}

impl MoveOutcome {
    /// Whether the board was mutated.
    pub fn is_accepted(self) -> bool {
        matches!(
            self,
            MoveOutcome::MoveAccepted | MoveOutcome::MoveAcceptedWin | MoveOutcome::MoveAcceptedDraw
        )
    }
}

/// Immutable copy of match state for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub board: Board,
    pub current_turn: Symbol,
    pub winner: Option<Symbol>,
    pub move_count: u8,
}

impl Snapshot {
    /// Terminal when someone won or every cell is filled.
    pub fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.move_count >= MAX_MOVES
    }
}

/// One tic-tac-toe match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToe {
    board: Board,
    current_turn: Symbol,
    move_count: u8,
    winner: Option<Symbol>,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    /// Creates an empty board with `X` to move.
    pub fn new() -> Self {
        Self {
            board: [[None; BOARD_SIZE]; BOARD_SIZE],
            current_turn: Symbol::X,
            move_count: 0,
            winner: None,
        }
    }

    /// Attempts to place `symbol` at (`row`, `col`).
    ///
    /// Coordinates are signed so that out-of-range client input (including
    /// negatives) is reported as [`MoveOutcome::InvalidCell`] rather than
    /// failing earlier in deserialization.
    pub fn make_move(&mut self, symbol: Symbol, row: i64, col: i64) -> MoveOutcome {
        if self.is_terminal() {
            return MoveOutcome::GameOver;
        }
        if symbol != self.current_turn {
            return MoveOutcome::WrongTurn;
        }
        let Some((r, c)) = cell_index(row, col) else {
            return MoveOutcome::InvalidCell;
        };
        if self.board[r][c].is_some() {
            return MoveOutcome::InvalidCell;
        }

        self.board[r][c] = Some(symbol);
        self.move_count += 1;

        if let Some(winner) = self.find_winner() {
            self.winner = Some(winner);
            return MoveOutcome::MoveAcceptedWin;
        }
        if self.move_count == MAX_MOVES {
            return MoveOutcome::MoveAcceptedDraw;
        }

        self.current_turn = self.current_turn.other();
        MoveOutcome::MoveAccepted
    }

    /// Scans all eight lines for three identical marks.
    fn find_winner(&self) -> Option<Symbol> {
        if self.move_count < MIN_MOVES_FOR_WIN {
            return None;
        }
        LINES.iter().find_map(|line| {
            let [a, b, c] = line.map(|(r, col)| self.board[r][col]);
            match (a, b, c) {
                (Some(x), Some(y), Some(z)) if x == y && y == z => Some(x),
                _ => None,
            }
        })
    }

    /// Clears the board and hands the first move back to `X`.
    ///
    /// Used both for the first start of a room's match and for rematches.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.move_count >= MAX_MOVES
    }

    pub fn current_turn(&self) -> Symbol {
        self.current_turn
    }

    pub fn winner(&self) -> Option<Symbol> {
        self.winner
    }

    pub fn move_count(&self) -> u8 {
        self.move_count
    }

    /// Copies the current state out; callers never see internal references.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board,
            current_turn: self.current_turn,
            winner: self.winner,
            move_count: self.move_count,
        }
    }
}

fn cell_index(row: i64, col: i64) -> Option<(usize, usize)> {
    let r = usize::try_from(row).ok()?;
    let c = usize::try_from(col).ok()?;
    (r < BOARD_SIZE && c < BOARD_SIZE).then_some((r, c))
}

//! # Noughts Core
//!
//! Transport-free game logic for two-player tic-tac-toe rooms.
//!
//! ## Components
//!
//! * [`engine`] - rules for one match: board, turn order, win and draw
//! * [`registry`] - rooms, their members and which are open
//! * [`session`] - per-connection identity
//! * [`coordinator`] - binds rooms to matches, handles rematch votes
//! * [`lobby`] - the aggregate the gateway drives, one method per intent
//!
//! Nothing in this crate performs I/O. Operations append addressed
//! [`ServerEvent`]s to an [`Outbox`] which the caller delivers afterwards.
//!
//! ## Example
//!
//! ```
//! use noughts_core::{ConnectionId, Lobby, LobbyConfig, Outbox, Symbol};
//!
//! let mut lobby = Lobby::new(LobbyConfig::default());
//! let mut outbox = Outbox::new();
//! lobby.connect(ConnectionId(1), "ann").unwrap();
//! lobby.connect(ConnectionId(2), "bob").unwrap();
//!
//! let seat = lobby.join_room(ConnectionId(1), "den", None, &mut outbox).unwrap();
//! assert_eq!(seat.symbol, Symbol::X);
//! lobby.join_room(ConnectionId(2), "den", None, &mut outbox).unwrap();
//! lobby.start_match(ConnectionId(1), "den", &mut outbox).unwrap();
//! ```

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod lobby;
pub mod registry;
pub mod session;
pub mod types;

pub use coordinator::{MatchCoordinator, RematchOutcome};
pub use engine::{Board, MoveOutcome, Snapshot, TicTacToe, BOARD_SIZE};
pub use error::{LobbyError, Status};
pub use events::{Envelope, Outbox, ServerEvent};
pub use lobby::{JoinReceipt, Lobby, LobbyConfig, LobbyStats, RoomInfo};
pub use registry::{LeaveOutcome, Member, Room, RoomRegistry};
pub use session::{Seat, Session, SessionManager};
pub use types::{ConnectionId, DisplayName, RoomId, Symbol};

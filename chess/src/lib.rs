//! Chess rules layer for chessbot.
//!
//! Wraps `cozy-chess` with the pieces a chat-driven game needs: a move
//! history with repetition tracking, loose SAN input, FEN helpers and a
//! terminal-condition check. cozy-chess types stay visible at the edges
//! (`Move`, `Board`) but callers mostly deal in FEN and SAN strings.

pub mod board_display;
pub mod converters;
pub mod fen;
pub mod game;
pub mod interpreter;
pub mod san;
pub mod types;
pub mod uci;

pub use board_display::{DisplayBoard, DisplayBoardError};
pub use converters::*;
pub use fen::{FenError, STARTING_FEN};
pub use game::{Game, GameError, HistoryEntry, Terminal};
pub use interpreter::{apply_move, classify_input, is_terminal, AppliedMove, InputKind};
pub use san::{format_san, parse_san, SanError};
pub use types::{PieceKind, Side};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move, parse_uci_move, UciMoveError};

//! Turning chat text into game actions.

use crate::game::{Game, GameError, Terminal};
use crate::san::{is_long_algebraic, parse_castling, split_san};

/// What a chat message means to a running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Looks like a move; still has to be checked against the position.
    Move(String),
    Resign,
    Draw,
    Takeback,
    /// Ordinary conversation.
    Unrecognized,
}

/// Result of a successful `apply_move`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub fen: String,
    pub san: String,
}

/// Classify a chat message. Control words are case-insensitive; move
/// syntax is checked without a position.
pub fn classify_input(text: &str) -> InputKind {
    let trimmed = text.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "resign" => return InputKind::Resign,
        "draw" => return InputKind::Draw,
        "takeback" => return InputKind::Takeback,
        _ => {}
    }
    if looks_like_move(trimmed) {
        InputKind::Move(trimmed.to_string())
    } else {
        InputKind::Unrecognized
    }
}

fn looks_like_move(text: &str) -> bool {
    if text.is_empty() || text.contains(char::is_whitespace) {
        return false;
    }
    if parse_castling(text).is_some() || is_long_algebraic(text) || split_san(text).is_some() {
        return true;
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            let capitalized = first.to_ascii_uppercase().to_string() + chars.as_str();
            split_san(&capitalized).is_some()
        }
        _ => false,
    }
}

/// Apply typed move text to a position given as FEN. The input position is
/// never modified; on error nothing is returned but the error.
pub fn apply_move(fen: &str, text: &str) -> Result<AppliedMove, GameError> {
    let mut game = Game::from_fen(fen)?;
    let entry = game.play_text(text)?;
    Ok(AppliedMove {
        fen: entry.fen.clone(),
        san: entry.san.clone(),
    })
}

/// Terminal check on a bare position. Repetition cannot be seen without
/// history, so only `Game::terminal` reports it.
pub fn is_terminal(fen: &str) -> Result<Option<Terminal>, GameError> {
    Ok(Game::from_fen(fen)?.terminal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::{side_to_move, STARTING_FEN};
    use crate::types::Side;

    #[test]
    fn test_control_words() {
        assert_eq!(classify_input("resign"), InputKind::Resign);
        assert_eq!(classify_input("  DRAW "), InputKind::Draw);
        assert_eq!(classify_input("Takeback"), InputKind::Takeback);
    }

    #[test]
    fn test_moves_are_recognised() {
        for text in [
            "e4", "Nf3", "nf3", "exd5", "Nbd7", "R1a3", "Qh4xe1", "e8=Q", "e8q", "O-O", "O-O-O",
            "0-0", "0-0-0", "Qh4#", "Bb5+", "e2e4", "e7e8q",
        ] {
            assert_eq!(classify_input(text), InputKind::Move(text.to_string()), "{text}");
        }
    }

    #[test]
    fn test_chatter_is_unrecognised() {
        for text in ["hello", "good game", "lol", "e9", "", "gg", "ok e4", "Zf3"] {
            assert_eq!(classify_input(text), InputKind::Unrecognized, "{text:?}");
        }
    }

    #[test]
    fn test_apply_move_scenario_a() {
        let applied = apply_move(STARTING_FEN, "e4").unwrap();
        assert_eq!(applied.san, "e4");
        assert_eq!(side_to_move(&applied.fen), Some(Side::Black));
    }

    #[test]
    fn test_apply_illegal_move() {
        assert!(matches!(
            apply_move(STARTING_FEN, "Qh5"),
            Err(GameError::Notation(_))
        ));
        assert!(matches!(apply_move("garbage", "e4"), Err(GameError::Fen(_))));
    }

    #[test]
    fn test_is_terminal_on_mate() {
        let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        assert_eq!(is_terminal(fen).unwrap(), Some(Terminal::Checkmate));
        assert_eq!(is_terminal(STARTING_FEN).unwrap(), None);
    }
}

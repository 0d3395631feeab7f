use cozy_chess::Board;

use crate::types::Side;

/// Standard initial position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fen = fen.trim();
    if fen.split_whitespace().count() != 6 {
        return Err(FenError::InvalidFormat(fen.to_string()));
    }
    fen.parse()
        .map_err(|_| FenError::InvalidPosition(fen.to_string()))
}

/// Format a Board as a FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// The piece-placement field (first field) of a FEN string.
pub fn placement(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or("")
}

/// Side to move according to the second FEN field.
pub fn side_to_move(fen: &str) -> Option<Side> {
    match fen.split_whitespace().nth(1)? {
        "w" => Some(Side::White),
        "b" => Some(Side::Black),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("FEN must have six fields: {0}")]
    InvalidFormat(String),
    #[error("FEN does not describe a legal position: {0}")]
    InvalidPosition(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_fen_roundtrip() {
        let board = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(format_fen(&board), STARTING_FEN);
        assert_eq!(board.hash(), Board::default().hash());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(parse_fen(""), Err(FenError::InvalidFormat(_))));
        assert!(matches!(
            parse_fen("not a fen"),
            Err(FenError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1"),
            Err(FenError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_fields() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        assert_eq!(placement(fen), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");
        assert_eq!(side_to_move(fen), Some(Side::Black));
        assert_eq!(side_to_move("8/8 x"), None);
    }
}

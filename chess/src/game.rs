use cozy_chess::{BitBoard, Board, Move, Piece};

use crate::converters::is_light_square;
use crate::fen::{format_fen, parse_fen, FenError};
use crate::san::{format_san, parse_san, SanError};
use crate::types::Side;

/// Game state: the current position plus everything needed for undo and
/// repetition detection.
#[derive(Debug, Clone)]
pub struct Game {
    start: Board,
    position: Board,
    history: Vec<HistoryEntry>,
    /// Hash of every position reached, the start position first.
    seen: Vec<u64>,
}

/// One half-move as it was played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub mv: Move,
    pub side: Side,
    /// Full-move number the move was played on.
    pub move_number: u16,
    pub san: String,
    /// FEN after this move.
    pub fen: String,
}

/// Conditions that end the game on the board itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        Self::from_board(Board::default())
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        Ok(Self::from_board(parse_fen(fen)?))
    }

    fn from_board(board: Board) -> Self {
        Self {
            seen: vec![board.hash()],
            start: board.clone(),
            position: board,
            history: Vec::new(),
        }
    }

    pub fn position(&self) -> &Board {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn side_to_move(&self) -> Side {
        Side::from(self.position.side_to_move())
    }

    pub fn in_check(&self) -> bool {
        !self.position.checkers().is_empty()
    }

    pub fn to_fen(&self) -> String {
        format_fen(&self.position)
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        legal_moves(&self.position)
    }

    /// Play a move given in cozy-chess encoding.
    pub fn make_move(&mut self, mv: Move) -> Result<&HistoryEntry, GameError> {
        if !self.legal_moves().contains(&mv) {
            return Err(GameError::IllegalMove);
        }

        let side = self.side_to_move();
        let move_number = self.position.fullmove_number();
        let san = format_san(&self.position, mv);
        self.position.play_unchecked(mv);
        self.seen.push(self.position.hash());

        self.history.push(HistoryEntry {
            mv,
            side,
            move_number,
            san,
            fen: self.to_fen(),
        });
        self.history.last().ok_or(GameError::IllegalMove)
    }

    /// Play a move typed by a person: SAN or long algebraic, with a
    /// lowercase piece letter tolerated ("nf3" plays Nf3).
    pub fn play_text(&mut self, text: &str) -> Result<&HistoryEntry, GameError> {
        let mv = match parse_san(&self.position, text) {
            Ok(mv) => mv,
            Err(first) => {
                let capitalized = capitalize_first(text.trim());
                if capitalized == text.trim() {
                    return Err(first.into());
                }
                parse_san(&self.position, &capitalized).map_err(|_| GameError::from(first))?
            }
        };
        self.make_move(mv)
    }

    /// Undo the last `plies` half-moves. Either all of them are undone or
    /// none.
    pub fn undo(&mut self, plies: usize) -> Result<(), GameError> {
        if plies == 0 || self.history.len() < plies {
            return Err(GameError::NothingToUndo);
        }
        self.history.truncate(self.history.len() - plies);
        self.seen.truncate(self.history.len() + 1);
        self.rebuild_position()
    }

    /// Board-level end of game, checked in the same order the players see
    /// them: mate and stalemate first, then the draw rules.
    pub fn terminal(&self) -> Option<Terminal> {
        let has_moves = self.position.generate_moves(|mvs| !mvs.is_empty());
        if !has_moves {
            return Some(if self.in_check() {
                Terminal::Checkmate
            } else {
                Terminal::Stalemate
            });
        }
        if self.repetitions() >= 3 {
            return Some(Terminal::ThreefoldRepetition);
        }
        if insufficient_material(&self.position) {
            return Some(Terminal::InsufficientMaterial);
        }
        if self.position.halfmove_clock() >= 100 {
            return Some(Terminal::FiftyMoveRule);
        }
        None
    }

    /// How many times the current position has occurred.
    pub fn repetitions(&self) -> usize {
        let current = self.position.hash();
        self.seen.iter().filter(|h| **h == current).count()
    }

    fn rebuild_position(&mut self) -> Result<(), GameError> {
        let mut board = self.start.clone();
        for entry in &self.history {
            board.try_play(entry.mv).map_err(|_| GameError::IllegalMove)?;
        }
        self.position = board;
        Ok(())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Neither side can mate: bare kings, a single minor piece, or only
/// bishops that all stand on one square colour.
pub fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    let minors = (knights | bishops).len();
    if minors <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }
    same_colour_squares(bishops)
}

fn same_colour_squares(squares: BitBoard) -> bool {
    let mut colours = squares.into_iter().map(is_light_square);
    match colours.next() {
        Some(first) => colours.all(|c| c == first),
        None => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Unrecognised move: {0}")]
    Notation(#[from] SanError),
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::side_to_move;
    use proptest::prelude::*;

    fn play_all(game: &mut Game, moves: &[&str]) {
        for m in moves {
            game.play_text(m).unwrap_or_else(|e| panic!("{m}: {e}"));
        }
    }

    #[test]
    fn test_make_move_records_san_and_fen() {
        let mut game = Game::new();
        let entry = game.play_text("e4").unwrap().clone();
        assert_eq!(entry.san, "e4");
        assert_eq!(entry.side, Side::White);
        assert_eq!(entry.move_number, 1);
        assert_eq!(side_to_move(&entry.fen), Some(Side::Black));
        assert_eq!(game.side_to_move(), Side::Black);
    }

    #[test]
    fn test_lowercase_piece_letters() {
        let mut game = Game::new();
        play_all(&mut game, &["e4", "e5", "nf3", "nc6", "bb5"]);
        let sans: Vec<&str> = game.history().iter().map(|e| e.san.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }

    #[test]
    fn test_pawn_b_file_capture_beats_bishop_reading() {
        // 1. b4 c5: "bxc5" is the pawn capture, not a bishop move.
        let mut game = Game::new();
        play_all(&mut game, &["b4", "c5", "bxc5"]);
        assert_eq!(game.history().last().unwrap().san, "bxc5");
    }

    #[test]
    fn test_illegal_move_leaves_position() {
        let mut game = Game::new();
        let before = game.to_fen();
        assert!(game.play_text("e5").is_err());
        assert!(game.play_text("Ke2").is_err());
        assert!(game.play_text("hello").is_err());
        assert_eq!(game.to_fen(), before);
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_undo_two_plies() {
        let mut game = Game::new();
        play_all(&mut game, &["e4", "e5", "Nf3"]);
        game.undo(2).unwrap();
        assert_eq!(game.history().len(), 1);
        assert_eq!(game.side_to_move(), Side::Black);
        assert_eq!(game.to_fen(), game.history()[0].fen);
        assert!(matches!(game.undo(2), Err(GameError::NothingToUndo)));
    }

    #[test]
    fn test_fools_mate_is_checkmate() {
        let mut game = Game::new();
        play_all(&mut game, &["f3", "e5", "g4", "Qh4"]);
        assert_eq!(game.history().last().unwrap().san, "Qh4#");
        assert_eq!(game.terminal(), Some(Terminal::Checkmate));
        // The side to move is the one that got mated.
        assert_eq!(game.side_to_move(), Side::White);
    }

    #[test]
    fn test_stalemate() {
        let game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(game.terminal(), Some(Terminal::Stalemate));
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        play_all(
            &mut game,
            &["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1", "Ng8"],
        );
        assert_eq!(game.repetitions(), 3);
        assert_eq!(game.terminal(), Some(Terminal::ThreefoldRepetition));
    }

    #[test]
    fn test_insufficient_material() {
        for fen in [
            "8/8/8/4k3/8/8/8/4K3 w - - 0 1",
            "8/8/8/4k3/8/8/8/4KN2 w - - 0 1",
            "8/8/8/4k3/8/8/8/2B1K3 w - - 0 1",
            // Bishops on c1 and f8 are both dark squares.
            "5b2/8/8/4k3/8/8/8/2B1K3 w - - 0 1",
        ] {
            let game = Game::from_fen(fen).unwrap();
            assert_eq!(game.terminal(), Some(Terminal::InsufficientMaterial), "{fen}");
        }
        for fen in [
            "8/8/8/4k3/8/8/4P3/4K3 w - - 0 1",
            "8/8/8/4k3/8/8/8/2BBK3 w - - 0 1",
            "8/8/8/4k3/8/8/8/1NB1K3 w - - 0 1",
        ] {
            let game = Game::from_fen(fen).unwrap();
            assert_eq!(game.terminal(), None, "{fen}");
        }
    }

    #[test]
    fn test_fifty_move_rule() {
        let game = Game::from_fen("8/8/8/4k3/8/8/R7/4K3 w - - 100 80").unwrap();
        assert_eq!(game.terminal(), Some(Terminal::FiftyMoveRule));
    }

    proptest! {
        /// Replaying the same move sequence always yields the same FEN as
        /// playing directly on a bare cozy-chess board.
        #[test]
        fn prop_replay_matches_reference(choices in proptest::collection::vec(0usize..256, 0..40)) {
            let mut game = Game::new();
            let mut reference = Board::default();
            for choice in choices {
                let legal = game.legal_moves();
                if legal.is_empty() {
                    break;
                }
                let mv = legal[choice % legal.len()];
                let san = format_san(game.position(), mv);
                game.play_text(&san).unwrap();
                reference.play(mv);
                prop_assert_eq!(game.to_fen(), format_fen(&reference));
            }
        }

        /// A rejected move never changes the position.
        #[test]
        fn prop_rejected_moves_are_idempotent(
            choices in proptest::collection::vec(0usize..256, 0..20),
            junk in "[a-zA-Z0-9=+#-]{1,6}",
        ) {
            let mut game = Game::new();
            for choice in choices {
                let legal = game.legal_moves();
                if legal.is_empty() {
                    break;
                }
                game.make_move(legal[choice % legal.len()]).unwrap();
            }
            let before = game.to_fen();
            let plies = game.history().len();
            if game.play_text(&junk).is_err() {
                prop_assert_eq!(game.to_fen(), before);
                prop_assert_eq!(game.history().len(), plies);
            }
        }
    }
}

//! Standard Algebraic Notation: formatting and tolerant parsing.

use cozy_chess::{Board, File, GameStatus, Move, Piece, Rank, Square};

use crate::converters::{
    file_to_char, format_square, parse_file, parse_promotion, parse_rank, parse_square,
    rank_to_char,
};
use crate::game::legal_moves;
use crate::types::PieceKind;
use crate::uci::{convert_uci_castling_to_cozy, parse_uci_move};

/// Which way a castling move goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

/// The pieces of a SAN token before it is matched against a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanParts {
    pub piece: Piece,
    pub from_file: Option<File>,
    pub from_rank: Option<Rank>,
    pub capture: bool,
    pub to: Square,
    pub promotion: Option<Piece>,
}

/// Strip check/mate and annotation suffixes.
fn strip_suffixes(text: &str) -> &str {
    text.trim().trim_end_matches(['+', '#', '!', '?'])
}

/// Recognise castling in the `O-O` / `0-0` conventions, hyphens optional.
pub fn parse_castling(text: &str) -> Option<CastleSide> {
    let normalized: String = strip_suffixes(text)
        .chars()
        .filter(|c| *c != '-')
        .map(|c| if c == '0' { 'O' } else { c.to_ascii_uppercase() })
        .collect();
    match normalized.as_str() {
        "OO" => Some(CastleSide::King),
        "OOO" => Some(CastleSide::Queen),
        _ => None,
    }
}

/// Long algebraic ("e2e4", "e7e8q") as accepted by sloppy parsing.
pub fn is_long_algebraic(text: &str) -> bool {
    let text = strip_suffixes(text);
    text.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) && parse_uci_move(text).is_ok()
}

/// Split a SAN token into its parts without looking at a position.
///
/// Piece letters are only recognised in uppercase here; callers wanting
/// case-insensitive piece letters retry with the first letter capitalised.
pub fn split_san(text: &str) -> Option<SanParts> {
    let text = strip_suffixes(text);
    if !text.is_ascii() || text.len() < 2 {
        return None;
    }
    let mut body = text;

    let mut promotion = None;
    if let Some(stripped) = body.strip_suffix(|c: char| parse_promotion(c).is_some()) {
        let promo_char = body.chars().last()?;
        if let Some(before_eq) = stripped.strip_suffix('=') {
            promotion = parse_promotion(promo_char);
            body = before_eq;
        } else if stripped.ends_with(|c: char| c.is_ascii_digit()) {
            promotion = parse_promotion(promo_char);
            body = stripped;
        }
    }

    if body.len() < 2 {
        return None;
    }
    let (prefix, dest) = body.split_at(body.len() - 2);
    let to = parse_square(dest)?;

    let mut chars = prefix.chars().peekable();
    let piece = match chars.peek() {
        Some(&c) if matches!(c, 'N' | 'B' | 'R' | 'Q' | 'K') => {
            chars.next();
            PieceKind::from_char(c).map(Piece::from)?
        }
        _ => Piece::Pawn,
    };

    let mut from_file = None;
    let mut from_rank = None;
    let mut capture = false;
    for c in chars {
        if capture {
            return None;
        }
        match c {
            'x' | 'X' | ':' => capture = true,
            c if from_file.is_none() && from_rank.is_none() && parse_file(c).is_some() && c.is_ascii_lowercase() => {
                from_file = parse_file(c);
            }
            c if from_rank.is_none() && parse_rank(c).is_some() => from_rank = parse_rank(c),
            _ => return None,
        }
    }

    if promotion.is_some() && piece != Piece::Pawn {
        return None;
    }

    Some(SanParts {
        piece,
        from_file,
        from_rank,
        capture,
        to,
        promotion,
    })
}

/// Resolve a SAN (or long-algebraic) token to a legal move on `board`.
///
/// Tolerated looseness: missing or wrong check/mate suffixes, a missing or
/// spurious capture marker, a missing promotion piece (queen is assumed),
/// uppercase file letters in the destination, and either castling style.
pub fn parse_san(board: &Board, text: &str) -> Result<Move, SanError> {
    let legal = legal_moves(board);

    if let Some(side) = parse_castling(text) {
        return legal
            .iter()
            .copied()
            .find(|mv| is_castle(board, *mv) == Some(side))
            .ok_or_else(|| SanError::NoLegalMove(text.to_string()));
    }

    if is_long_algebraic(text) {
        let mv = parse_uci_move(strip_suffixes(text))
            .map_err(|_| SanError::InvalidFormat(text.to_string()))?;
        let mv = convert_uci_castling_to_cozy(mv, &legal);
        return if legal.contains(&mv) {
            Ok(mv)
        } else {
            Err(SanError::NoLegalMove(text.to_string()))
        };
    }

    let parts = split_san(text).ok_or_else(|| SanError::InvalidFormat(text.to_string()))?;

    let candidates: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|mv| board.piece_on(mv.from) == Some(parts.piece))
        .filter(|mv| mv.to == parts.to && is_castle(board, *mv).is_none())
        .filter(|mv| parts.from_file.is_none_or(|f| mv.from.file() == f))
        .filter(|mv| parts.from_rank.is_none_or(|r| mv.from.rank() == r))
        // A pawn token without a source file is a straight push, never a capture.
        .filter(|mv| {
            parts.piece != Piece::Pawn || parts.from_file.is_some() || mv.from.file() == mv.to.file()
        })
        .filter(|mv| match (mv.promotion, parts.promotion) {
            (None, None) => true,
            (Some(p), Some(want)) => p == want,
            (Some(p), None) => p == Piece::Queen,
            (None, Some(_)) => false,
        })
        .collect();

    match candidates.as_slice() {
        [] => Err(SanError::NoLegalMove(text.to_string())),
        [mv] => Ok(*mv),
        _ => Err(SanError::AmbiguousMove(text.to_string())),
    }
}

/// Classify a legal move as castling. cozy-chess encodes castling as the
/// king capturing its own rook.
fn is_castle(board: &Board, mv: Move) -> Option<CastleSide> {
    if board.piece_on(mv.from) != Some(Piece::King) {
        return None;
    }
    if board.color_on(mv.to) != Some(board.side_to_move()) {
        return None;
    }
    if (mv.to.file() as usize) > (mv.from.file() as usize) {
        Some(CastleSide::King)
    } else {
        Some(CastleSide::Queen)
    }
}

/// Format a legal move as SAN, including disambiguation and `+`/`#`.
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = match is_castle(board, mv) {
        Some(CastleSide::King) => "O-O".to_string(),
        Some(CastleSide::Queen) => "O-O-O".to_string(),
        None => format_piece_move(board, mv),
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        if after.status() == GameStatus::Won {
            san.push('#');
        } else {
            san.push('+');
        }
    }
    san
}

fn format_piece_move(board: &Board, mv: Move) -> String {
    let mut san = String::new();
    let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
    let is_capture = board.piece_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    match PieceKind::from(piece).san_letter() {
        Some(letter) => {
            san.push(letter);
            let rivals: Vec<Square> = legal_moves(board)
                .into_iter()
                .filter(|other| {
                    other.to == mv.to
                        && other.from != mv.from
                        && board.piece_on(other.from) == Some(piece)
                })
                .map(|other| other.from)
                .collect();
            if !rivals.is_empty() {
                let file_unique = rivals.iter().all(|sq| sq.file() != mv.from.file());
                let rank_unique = rivals.iter().all(|sq| sq.rank() != mv.from.rank());
                if file_unique {
                    san.push(file_to_char(mv.from.file()));
                } else if rank_unique {
                    san.push(rank_to_char(mv.from.rank()));
                } else {
                    san.push_str(&format_square(mv.from));
                }
            }
        }
        None => {
            if is_capture {
                san.push(file_to_char(mv.from.file()));
            }
        }
    }

    if is_capture {
        san.push('x');
    }
    san.push_str(&format_square(mv.to));

    if let Some(promo) = mv.promotion {
        san.push('=');
        if let Some(letter) = PieceKind::from(promo).san_letter() {
            san.push(letter);
        }
    }
    san
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

//! Lightweight board representation for text rendering from FEN.

use crate::types::{PieceKind, Side};

/// An 8x8 board for display purposes only.
#[derive(Debug, Clone, Default)]
pub struct DisplayBoard {
    squares: [[Option<(PieceKind, Side)>; 8]; 8],
}

impl DisplayBoard {
    /// Parse the board placement from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, DisplayBoardError> {
        let placement = fen
            .split_whitespace()
            .next()
            .ok_or(DisplayBoardError::InvalidFen)?;

        let mut squares = [[None; 8]; 8];
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(DisplayBoardError::InvalidFen);
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if file > 7 {
                    return Err(DisplayBoardError::InvalidFen);
                }
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let side = if c.is_uppercase() {
                        Side::White
                    } else {
                        Side::Black
                    };
                    let kind = PieceKind::from_char(c).ok_or(DisplayBoardError::InvalidPiece(c))?;
                    squares[rank][file] = Some((kind, side));
                    file += 1;
                }
            }
        }

        Ok(DisplayBoard { squares })
    }

    pub fn piece_at(&self, file: u8, rank: u8) -> Option<(PieceKind, Side)> {
        if file > 7 || rank > 7 {
            return None;
        }
        self.squares[rank as usize][file as usize]
    }

    /// Plain-text diagram, rank 8 at the top from White's point of view or
    /// rank 1 at the top from Black's.
    pub fn to_ascii(&self, perspective: Side) -> String {
        let ranks: Vec<u8> = match perspective {
            Side::White => (0..8).rev().collect(),
            Side::Black => (0..8).collect(),
        };
        let files: Vec<u8> = match perspective {
            Side::White => (0..8).collect(),
            Side::Black => (0..8).rev().collect(),
        };

        let mut out = String::new();
        for rank in &ranks {
            out.push_str(&format!("{} ", rank + 1));
            for file in &files {
                let c = match self.piece_at(*file, *rank) {
                    Some((kind, Side::White)) => kind.to_char_lower().to_ascii_uppercase(),
                    Some((kind, Side::Black)) => kind.to_char_lower(),
                    None => '.',
                };
                out.push(' ');
                out.push(c);
            }
            out.push('\n');
        }
        out.push_str("  ");
        for file in &files {
            out.push(' ');
            out.push((b'a' + file) as char);
        }
        out.push('\n');
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DisplayBoardError {
    #[error("Invalid FEN string")]
    InvalidFen,
    #[error("Invalid piece character: {0}")]
    InvalidPiece(char),
}

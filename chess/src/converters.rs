//! Square, file, rank and piece text conversions.

use cozy_chess::{File, Piece, Rank, Square};

pub fn file_to_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_to_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

/// Case-insensitive file letter.
pub fn parse_file(c: char) -> Option<File> {
    match c.to_ascii_lowercase() {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::First),
        '2' => Some(Rank::Second),
        '3' => Some(Rank::Third),
        '4' => Some(Rank::Fourth),
        '5' => Some(Rank::Fifth),
        '6' => Some(Rank::Sixth),
        '7' => Some(Rank::Seventh),
        '8' => Some(Rank::Eighth),
        _ => None,
    }
}

/// "e4" style square name.
pub fn format_square(sq: Square) -> String {
    let mut s = String::with_capacity(2);
    s.push(file_to_char(sq.file()));
    s.push(rank_to_char(sq.rank()));
    s
}

/// Parse a two-character square, file letter in either case.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Lowercase piece letter as used in UCI promotions.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

/// Promotion target from a letter in either case. Pawns and kings are rejected.
pub fn parse_promotion(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'q' => Some(Piece::Queen),
        'r' => Some(Piece::Rook),
        'b' => Some(Piece::Bishop),
        'n' => Some(Piece::Knight),
        _ => None,
    }
}

/// Light squares have odd file+rank parity (a1 is dark).
pub fn is_light_square(sq: Square) -> bool {
    (sq.file() as usize + sq.rank() as usize) % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_roundtrip() {
        let sq = Square::new(File::E, Rank::Fourth);
        assert_eq!(format_square(sq), "e4");
        assert_eq!(parse_square("e4"), Some(sq));
        assert_eq!(parse_square("E4"), Some(sq));
        assert_eq!(parse_square("e9"), None);
        assert_eq!(parse_square("e44"), None);
    }

    #[test]
    fn test_square_colour() {
        assert!(!is_light_square(Square::new(File::A, Rank::First)));
        assert!(is_light_square(Square::new(File::H, Rank::First)));
        assert!(is_light_square(Square::new(File::D, Rank::First)));
    }
}

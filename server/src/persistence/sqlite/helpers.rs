//! Shared encode/decode helpers for SQLite ↔ domain type conversions.

use chess::STARTING_FEN;

use crate::persistence::{GameSession, GameType, Participant, PersistenceError};

/// Column list matching [`SessionRow`], in order.
pub const SESSION_COLUMNS: &str = "channel_id, display_message_id, fen, game_type, \
     white_id, white_name, black_id, black_name, difficulty, created_at";

pub type SessionRow = (
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i64,
);

/// Decode a `game_sessions` row. A position that no longer parses is replaced
/// by the starting position.
pub fn decode_session(row: SessionRow) -> Result<GameSession, PersistenceError> {
    let (
        channel_id,
        display_message_id,
        fen,
        game_type,
        white_id,
        white_name,
        black_id,
        black_name,
        difficulty,
        created_at,
    ) = row;

    let fen = match chess::fen::parse_fen(&fen) {
        Ok(_) => fen,
        Err(e) => {
            tracing::warn!(channel = %channel_id, "Stored position is corrupt ({}), resetting", e);
            STARTING_FEN.to_string()
        }
    };

    Ok(GameSession {
        channel_id,
        display_message_id,
        fen,
        game_type: game_type.parse::<GameType>()?,
        white: Participant::new(white_id, white_name),
        black: Participant::new(black_id, black_name),
        difficulty,
        created_at: created_at.max(0) as u64,
    })
}

/// Map a unique-constraint failure to `conflict`, anything else to a database error.
pub fn unique_violation_or(err: sqlx::Error, conflict: PersistenceError) -> PersistenceError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => conflict,
        _ => PersistenceError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fen: &str, game_type: &str) -> SessionRow {
        (
            "chan".to_string(),
            None,
            fen.to_string(),
            game_type.to_string(),
            "w".to_string(),
            "Alice".to_string(),
            "b".to_string(),
            "Bob".to_string(),
            None,
            42,
        )
    }

    #[test]
    fn corrupt_fen_resets_to_start() {
        let session = decode_session(row("garbage", "pvp")).unwrap();
        assert_eq!(session.fen, STARTING_FEN);
        assert_eq!(session.game_type, GameType::Pvp);
        assert_eq!(session.created_at, 42);
    }

    #[test]
    fn unknown_game_type_is_corrupt() {
        assert!(matches!(
            decode_session(row(STARTING_FEN, "blitz")),
            Err(PersistenceError::Corrupt(_))
        ));
    }
}

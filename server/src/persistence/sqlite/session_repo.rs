//! SQLite-backed repository for active games.

use sqlx::SqlitePool;

use super::helpers::{decode_session, unique_violation_or, SessionRow, SESSION_COLUMNS};
use crate::persistence::traits::SessionRepository;
use crate::persistence::{GameSession, PersistenceError};

/// SQLite implementation of [`SessionRepository`].
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn insert_session(
        &self,
        session: &GameSession,
        human_ids: &[&str],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO game_sessions
                (channel_id, display_message_id, fen, game_type,
                 white_id, white_name, black_id, black_name, difficulty, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.channel_id)
        .bind(&session.display_message_id)
        .bind(&session.fen)
        .bind(session.game_type.as_str())
        .bind(&session.white.id)
        .bind(&session.white.name)
        .bind(&session.black.id)
        .bind(&session.black.name)
        .bind(&session.difficulty)
        .bind(session.created_at as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            unique_violation_or(e, PersistenceError::ChannelOccupied(session.channel_id.clone()))
        })?;

        for user_id in human_ids {
            sqlx::query("INSERT INTO session_players (user_id, channel_id) VALUES (?, ?)")
                .bind(*user_id)
                .bind(&session.channel_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| unique_violation_or(e, PersistenceError::PlayerBusy(user_id.to_string())))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_session(&self, channel_id: &str) -> Result<Option<GameSession>, PersistenceError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM game_sessions WHERE channel_id = ?",
            SESSION_COLUMNS
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_session).transpose()
    }

    async fn session_for_player(&self, user_id: &str) -> Result<Option<String>, PersistenceError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT channel_id FROM session_players WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(channel_id,)| channel_id))
    }

    async fn list_sessions(&self) -> Result<Vec<GameSession>, PersistenceError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM game_sessions ORDER BY created_at DESC",
            SESSION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_session).collect()
    }

    async fn delete_session(&self, channel_id: &str) -> Result<Option<GameSession>, PersistenceError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "DELETE FROM game_sessions WHERE channel_id = ? RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_session).transpose()
    }

    async fn update_position(&self, channel_id: &str, fen: &str) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE game_sessions SET fen = ? WHERE channel_id = ?")
            .bind(fen)
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_display_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE game_sessions SET display_message_id = ? WHERE channel_id = ?")
            .bind(message_id)
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, cutoff: u64) -> Result<Vec<String>, PersistenceError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("DELETE FROM game_sessions WHERE created_at < ? RETURNING channel_id")
                .bind(cutoff as i64)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(channel_id,)| channel_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;
    use crate::persistence::{GameType, Participant};
    use chess::STARTING_FEN;

    async fn test_db() -> (Database, SqliteSessionRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqliteSessionRepository::new(db.pool().clone());
        (db, repo)
    }

    fn sample_session(channel: &str, white: &str, black: &str, ts: u64) -> GameSession {
        GameSession {
            channel_id: channel.to_string(),
            display_message_id: None,
            fen: STARTING_FEN.to_string(),
            game_type: GameType::Pvp,
            white: Participant::new(white, white.to_uppercase()),
            black: Participant::new(black, black.to_uppercase()),
            difficulty: None,
            created_at: ts,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (_db, repo) = test_db().await;
        let session = sample_session("c1", "alice", "bob", 100);
        repo.insert_session(&session, &["alice", "bob"]).await.unwrap();

        assert_eq!(repo.get_session("c1").await.unwrap(), Some(session));
        assert_eq!(repo.get_session("c2").await.unwrap(), None);
        assert_eq!(
            repo.session_for_player("bob").await.unwrap(),
            Some("c1".to_string())
        );
    }

    #[tokio::test]
    async fn test_channel_occupied() {
        let (_db, repo) = test_db().await;
        repo.insert_session(&sample_session("c1", "alice", "bob", 100), &["alice", "bob"])
            .await
            .unwrap();
        let err = repo
            .insert_session(&sample_session("c1", "carol", "dave", 200), &["carol", "dave"])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::ChannelOccupied(c) if c == "c1"));
        assert_eq!(repo.session_for_player("carol").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_player_busy_rolls_back_everything() {
        let (_db, repo) = test_db().await;
        repo.insert_session(&sample_session("c1", "alice", "bob", 100), &["alice", "bob"])
            .await
            .unwrap();

        // carol is free but bob is not: neither the session nor carol's seat may remain.
        let err = repo
            .insert_session(&sample_session("c2", "carol", "bob", 200), &["carol", "bob"])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::PlayerBusy(p) if p == "bob"));
        assert_eq!(repo.get_session("c2").await.unwrap(), None);
        assert_eq!(repo.session_for_player("carol").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_returns_row_once() {
        let (_db, repo) = test_db().await;
        let session = sample_session("c1", "alice", "bob", 100);
        repo.insert_session(&session, &["alice", "bob"]).await.unwrap();

        assert_eq!(repo.delete_session("c1").await.unwrap(), Some(session));
        assert_eq!(repo.delete_session("c1").await.unwrap(), None);
        // Seats are released with the session.
        assert_eq!(repo.session_for_player("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_position_and_message() {
        let (_db, repo) = test_db().await;
        repo.insert_session(&sample_session("c1", "alice", "bob", 100), &["alice", "bob"])
            .await
            .unwrap();
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        repo.update_position("c1", fen).await.unwrap();
        repo.set_display_message("c1", "msg-7").await.unwrap();

        let loaded = repo.get_session("c1").await.unwrap().unwrap();
        assert_eq!(loaded.fen, fen);
        assert_eq!(loaded.display_message_id.as_deref(), Some("msg-7"));
    }

    #[tokio::test]
    async fn test_purge_expired_only_removes_old() {
        let (_db, repo) = test_db().await;
        repo.insert_session(&sample_session("old", "a", "b", 100), &["a", "b"])
            .await
            .unwrap();
        repo.insert_session(&sample_session("new", "c", "d", 5000), &["c", "d"])
            .await
            .unwrap();

        let purged = repo.purge_expired(1000).await.unwrap();
        assert_eq!(purged, vec!["old".to_string()]);

        let remaining = repo.list_sessions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].channel_id, "new");
        assert_eq!(repo.session_for_player("a").await.unwrap(), None);
    }
}

//! SQLite-backed repository for player profiles and game history.

use sqlx::SqlitePool;

use crate::persistence::traits::ProfileRepository;
use crate::persistence::{
    GameResultKind, PersistenceError, PlayerProfile, RecentGame, ResultEntry, RECENT_GAMES_LIMIT,
};

type ProfileRow = (String, String, i64, i64, i64, i64);

fn decode_profile(row: ProfileRow) -> PlayerProfile {
    let (user_id, display_name, elo, wins, losses, draws) = row;
    PlayerProfile {
        user_id,
        display_name,
        elo: elo as i32,
        wins: wins as u32,
        losses: losses as u32,
        draws: draws as u32,
    }
}

/// SQLite implementation of [`ProfileRepository`].
#[derive(Clone)]
pub struct SqliteProfileRepository {
    pool: SqlitePool,
}

impl SqliteProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ProfileRepository for SqliteProfileRepository {
    async fn ensure_profile(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<PlayerProfile, PersistenceError> {
        let row: ProfileRow = sqlx::query_as(
            r#"
            INSERT INTO player_profiles (user_id, display_name)
            VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name
            RETURNING user_id, display_name, elo, wins, losses, draws
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(decode_profile(row))
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<PlayerProfile>, PersistenceError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, display_name, elo, wins, losses, draws FROM player_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(decode_profile))
    }

    async fn recent_games(&self, user_id: &str) -> Result<Vec<RecentGame>, PersistenceError> {
        let rows: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT opponent_id, opponent_name, result, elo_delta, played_at
            FROM recent_games
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(RECENT_GAMES_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(opponent_id, opponent_name, result, elo_delta, played_at)| -> Result<RecentGame, PersistenceError> {
                Ok(RecentGame {
                    opponent_id,
                    opponent_name,
                    result: result.parse()?,
                    elo_delta: elo_delta as i32,
                    played_at: played_at.max(0) as u64,
                })
            })
            .collect()
    }

    async fn record_results(&self, entries: &[ResultEntry]) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            if let Some(new_elo) = entry.new_elo {
                let (wins, losses, draws) = match entry.game.result {
                    GameResultKind::Win => (1, 0, 0),
                    GameResultKind::Loss => (0, 1, 0),
                    GameResultKind::Draw => (0, 0, 1),
                };
                let updated = sqlx::query(
                    r#"
                    UPDATE player_profiles
                    SET elo = ?, wins = wins + ?, losses = losses + ?, draws = draws + ?
                    WHERE user_id = ?
                    "#,
                )
                .bind(new_elo as i64)
                .bind(wins as i64)
                .bind(losses as i64)
                .bind(draws as i64)
                .bind(&entry.user_id)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() != 1 {
                    // Dropping the transaction rolls back anything already written.
                    return Err(PersistenceError::Corrupt(format!(
                        "no profile for {}",
                        entry.user_id
                    )));
                }
            }

            sqlx::query(
                r#"
                INSERT INTO recent_games
                    (user_id, opponent_id, opponent_name, result, elo_delta, played_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.user_id)
            .bind(&entry.game.opponent_id)
            .bind(&entry.game.opponent_name)
            .bind(entry.game.result.as_str())
            .bind(entry.game.elo_delta as i64)
            .bind(entry.game.played_at as i64)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                DELETE FROM recent_games
                WHERE user_id = ?1
                  AND id NOT IN (
                      SELECT id FROM recent_games WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2
                  )
                "#,
            )
            .bind(&entry.user_id)
            .bind(RECENT_GAMES_LIMIT)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;
    use crate::persistence::DEFAULT_ELO;

    async fn test_db() -> (Database, SqliteProfileRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqliteProfileRepository::new(db.pool().clone());
        (db, repo)
    }

    fn entry(user: &str, opponent: &str, result: GameResultKind, elo: Option<i32>, at: u64) -> ResultEntry {
        ResultEntry {
            user_id: user.to_string(),
            new_elo: elo,
            game: RecentGame {
                opponent_id: opponent.to_string(),
                opponent_name: opponent.to_uppercase(),
                result,
                elo_delta: elo.map(|e| e - DEFAULT_ELO).unwrap_or(0),
                played_at: at,
            },
        }
    }

    #[tokio::test]
    async fn test_ensure_profile_defaults_and_renames() {
        let (_db, repo) = test_db().await;
        let profile = repo.ensure_profile("alice", "Alice").await.unwrap();
        assert_eq!(profile.elo, DEFAULT_ELO);
        assert_eq!((profile.wins, profile.losses, profile.draws), (0, 0, 0));

        let renamed = repo.ensure_profile("alice", "Alicia").await.unwrap();
        assert_eq!(renamed.display_name, "Alicia");
        assert_eq!(repo.load_profile("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_results_updates_both_sides() {
        let (_db, repo) = test_db().await;
        repo.ensure_profile("alice", "Alice").await.unwrap();
        repo.ensure_profile("bob", "Bob").await.unwrap();

        repo.record_results(&[
            entry("alice", "bob", GameResultKind::Win, Some(1216), 10),
            entry("bob", "alice", GameResultKind::Loss, Some(1184), 10),
        ])
        .await
        .unwrap();

        let alice = repo.load_profile("alice").await.unwrap().unwrap();
        let bob = repo.load_profile("bob").await.unwrap().unwrap();
        assert_eq!((alice.elo, alice.wins), (1216, 1));
        assert_eq!((bob.elo, bob.losses), (1184, 1));

        let history = repo.recent_games("bob").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, GameResultKind::Loss);
        assert_eq!(history[0].elo_delta, -16);
    }

    #[tokio::test]
    async fn test_history_only_entry_leaves_rating() {
        let (_db, repo) = test_db().await;
        repo.ensure_profile("alice", "Alice").await.unwrap();
        repo.record_results(&[entry("alice", "bot", GameResultKind::Win, None, 10)])
            .await
            .unwrap();

        let alice = repo.load_profile("alice").await.unwrap().unwrap();
        assert_eq!((alice.elo, alice.wins), (DEFAULT_ELO, 0));
        assert_eq!(repo.recent_games("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_rolls_back() {
        let (_db, repo) = test_db().await;
        repo.ensure_profile("alice", "Alice").await.unwrap();

        let result = repo
            .record_results(&[
                entry("alice", "ghost", GameResultKind::Win, Some(1216), 10),
                entry("ghost", "alice", GameResultKind::Loss, Some(1184), 10),
            ])
            .await;
        assert!(result.is_err());

        let alice = repo.load_profile("alice").await.unwrap().unwrap();
        assert_eq!((alice.elo, alice.wins), (DEFAULT_ELO, 0));
        assert!(repo.recent_games("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_trimmed_to_limit() {
        let (_db, repo) = test_db().await;
        repo.ensure_profile("alice", "Alice").await.unwrap();
        for i in 0..15u64 {
            repo.record_results(&[entry("alice", "bot", GameResultKind::Draw, None, i)])
                .await
                .unwrap();
        }

        let history = repo.recent_games("alice").await.unwrap();
        assert_eq!(history.len(), RECENT_GAMES_LIMIT as usize);
        assert_eq!(history[0].played_at, 14);
        assert_eq!(history[9].played_at, 5);

        let (stored,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recent_games")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(stored, RECENT_GAMES_LIMIT);
    }
}

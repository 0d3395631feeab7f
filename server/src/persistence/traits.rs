//! Async repository trait definitions for the persistence layer.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which `tokio::spawn` needs when a
//! session actor holds a repository.

use super::{GameSession, PersistenceError, PlayerProfile, RecentGame, ResultEntry};
use std::future::Future;

/// Repository for active games and the players seated in them.
///
/// `insert_session` must be atomic: the session row and every human player
/// row are written together, or nothing is written.
pub trait SessionRepository: Send + Sync {
    fn insert_session(
        &self,
        session: &GameSession,
        human_ids: &[&str],
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn get_session(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<Option<GameSession>, PersistenceError>> + Send;
    fn session_for_player(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;
    fn list_sessions(
        &self,
    ) -> impl Future<Output = Result<Vec<GameSession>, PersistenceError>> + Send;
    /// Remove and return the session. Only one caller can ever get `Some`.
    fn delete_session(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<Option<GameSession>, PersistenceError>> + Send;
    fn update_position(
        &self,
        channel_id: &str,
        fen: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn set_display_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    /// Delete sessions created before `cutoff`, returning their channel ids.
    fn purge_expired(
        &self,
        cutoff: u64,
    ) -> impl Future<Output = Result<Vec<String>, PersistenceError>> + Send;
}

/// Repository for ratings, counters and per-player game history.
pub trait ProfileRepository: Send + Sync {
    /// Create the profile if absent; refresh the display name otherwise.
    fn ensure_profile(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<PlayerProfile, PersistenceError>> + Send;
    fn load_profile(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<PlayerProfile>, PersistenceError>> + Send;
    /// Newest first, at most the retained history length.
    fn recent_games(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<RecentGame>, PersistenceError>> + Send;
    /// Apply every entry in one transaction.
    fn record_results(
        &self,
        entries: &[ResultEntry],
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

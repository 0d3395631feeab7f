//! Persistence layer: data types, repository traits and the SQLite backend.

pub mod sqlite;
pub mod traits;

pub use traits::{ProfileRepository, SessionRepository};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("A game is already running in channel {0}")]
    ChannelOccupied(String),
    #[error("Player {0} is already in a game")]
    PlayerBusy(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Pvp,
    Pve,
}

impl GameType {
    pub fn as_str(self) -> &'static str {
        match self {
            GameType::Pvp => "pvp",
            GameType::Pve => "pve",
        }
    }
}

impl FromStr for GameType {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pvp" => Ok(GameType::Pvp),
            "pve" => Ok(GameType::Pve),
            other => Err(PersistenceError::Corrupt(format!("unknown game type '{}'", other))),
        }
    }
}

/// A chat user taking part in a game. The bot is a participant too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Persisted record of one active game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub channel_id: String,
    pub display_message_id: Option<String>,
    pub fen: String,
    pub game_type: GameType,
    pub white: Participant,
    pub black: Participant,
    pub difficulty: Option<String>,
    pub created_at: u64,
}

impl GameSession {
    pub fn player(&self, side: chess::Side) -> &Participant {
        match side {
            chess::Side::White => &self.white,
            chess::Side::Black => &self.black,
        }
    }

    pub fn side_of(&self, user_id: &str) -> Option<chess::Side> {
        if self.white.id == user_id {
            Some(chess::Side::White)
        } else if self.black.id == user_id {
            Some(chess::Side::Black)
        } else {
            None
        }
    }

    /// Human participants; the bot seat in a PvE game is excluded.
    pub fn humans(&self, bot_id: &str) -> Vec<&Participant> {
        [&self.white, &self.black]
            .into_iter()
            .filter(|p| p.id != bot_id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResultKind {
    Win,
    Loss,
    Draw,
}

impl GameResultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameResultKind::Win => "win",
            GameResultKind::Loss => "loss",
            GameResultKind::Draw => "draw",
        }
    }
}

impl fmt::Display for GameResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameResultKind {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(GameResultKind::Win),
            "loss" => Ok(GameResultKind::Loss),
            "draw" => Ok(GameResultKind::Draw),
            other => Err(PersistenceError::Corrupt(format!("unknown result '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentGame {
    pub opponent_id: String,
    pub opponent_name: String,
    pub result: GameResultKind,
    pub elo_delta: i32,
    pub played_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub user_id: String,
    pub display_name: String,
    pub elo: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

/// One player's side of a finished game, as written by the outcome resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub user_id: String,
    /// New rating, or `None` to leave the rating and counters alone.
    pub new_elo: Option<i32>,
    pub game: RecentGame,
}

pub const DEFAULT_ELO: i32 = 1200;
pub const RECENT_GAMES_LIMIT: i64 = 10;

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

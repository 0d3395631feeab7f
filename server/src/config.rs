//! Configuration for the chessbot service
//!
//! Every setting comes from an environment variable with a compiled-in
//! default; values that fail to parse fall back to the default. The data
//! directory is resolved with the following precedence:
//! 1. CHESSBOT_DATA_DIR environment variable
//! 2. the platform data directory (e.g. ~/.local/share/chessbot)
//! 3. ./data (fallback for development)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;

use crate::render::DEFAULT_IMAGE_BASE;

const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "chessbot.db";

/// Get the data directory for persistence.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSBOT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = ProjectDirs::from("", "", "chessbot") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(env_or(name, default))
}

/// Timers and switches for running games.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    pub game_timeout: Duration,
    pub challenge_timeout: Duration,
    pub offer_timeout: Duration,
    /// Sessions older than this are swept away.
    pub session_ttl: Duration,
    pub takeback_enabled: bool,
    pub image_base: String,
    /// Chat identity the bot plays under in PvE games.
    pub bot_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(120),
            game_timeout: Duration::from_secs(1800),
            challenge_timeout: Duration::from_secs(60),
            offer_timeout: Duration::from_secs(60),
            session_ttl: Duration::from_secs(3600),
            takeback_enabled: true,
            image_base: DEFAULT_IMAGE_BASE.to_string(),
            bot_id: "chessbot".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub engine: engine::EngineConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Read the whole configuration from the environment.
    pub fn from_env() -> Self {
        let defaults = SessionConfig::default();
        let engine_defaults = engine::EngineConfig::default();

        let session = SessionConfig {
            idle_timeout: env_secs("CHESSBOT_IDLE_TIMEOUT_SECS", defaults.idle_timeout.as_secs()),
            game_timeout: env_secs("CHESSBOT_GAME_TIMEOUT_SECS", defaults.game_timeout.as_secs()),
            challenge_timeout: env_secs(
                "CHESSBOT_CHALLENGE_TIMEOUT_SECS",
                defaults.challenge_timeout.as_secs(),
            ),
            offer_timeout: env_secs("CHESSBOT_OFFER_TIMEOUT_SECS", defaults.offer_timeout.as_secs()),
            session_ttl: env_secs("CHESSBOT_SESSION_TTL_SECS", defaults.session_ttl.as_secs()),
            takeback_enabled: env_or("CHESSBOT_TAKEBACK_ENABLED", defaults.takeback_enabled),
            image_base: std::env::var("CHESSBOT_BOARD_IMAGE_BASE").unwrap_or(defaults.image_base),
            bot_id: defaults.bot_id,
        };

        let engine = engine::EngineConfig {
            path: std::env::var_os("CHESSBOT_ENGINE_PATH").map(PathBuf::from),
            think_time: Duration::from_millis(env_or(
                "CHESSBOT_ENGINE_THINK_MS",
                engine_defaults.think_time.as_millis() as u64,
            )),
            move_timeout: env_secs(
                "CHESSBOT_ENGINE_TIMEOUT_SECS",
                engine_defaults.move_timeout.as_secs(),
            ),
            ..engine_defaults
        };

        Self {
            data_dir: get_data_dir(),
            engine,
            session,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

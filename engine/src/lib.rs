pub mod difficulty;
pub mod stockfish;
pub mod uci;

pub use difficulty::{Difficulty, ParseDifficultyError};
pub use stockfish::{find_stockfish_path, EngineConfig, StockfishEngine, StockfishLauncher};
pub use uci::{parse_uci_message, UciError, UciMessage};

use async_trait::async_trait;
use cozy_chess::Move;

/// Events received from the engine process
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    BestMove(Move),
    /// `bestmove (none)`: the engine has nothing to play.
    NoMove,
    Info(EngineInfo),
}

/// Search progress reported by the engine
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    #[error("Engine did not answer within {0} ms")]
    Timeout(u64),
    #[error("Engine has no move in this position")]
    NoMove,
    #[error("Engine process exited")]
    Crashed,
    #[error("Invalid position for engine: {0}")]
    InvalidPosition(String),
}

/// A computer opponent bound to one game.
#[async_trait]
pub trait OpponentEngine: Send + Sync {
    /// Best move for the side to move in `fen`, in cozy-chess encoding.
    async fn request_move(&mut self, fen: &str) -> Result<Move, EngineError>;

    /// Stop the opponent. Calling this more than once is harmless.
    async fn shutdown(&mut self);

    fn name(&self) -> &str;
}

/// Starts a fresh opponent for each PvE game.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self, difficulty: Difficulty) -> Result<Box<dyn OpponentEngine>, EngineError>;
}

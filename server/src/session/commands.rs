use tokio::sync::{oneshot, OwnedMutexGuard};

use super::snapshot::SessionSnapshot;
use super::ChatMessage;
use crate::outcome::{EndReason, GameSummary};
use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A game is already in progress in this channel!")]
    ChannelOccupied,
    #[error("{0} is already in a game!")]
    PlayerBusy(String),
    #[error("You can't challenge yourself!")]
    SelfChallenge,
    #[error("You can't challenge a bot.")]
    BotOpponent,
    #[error("You must select a difficulty when playing against the bot.")]
    DifficultyRequired,
    #[error("Difficulty only applies to games against the bot.")]
    DifficultyWithOpponent,
    #[error("The chess engine is not available: {0}")]
    EngineUnavailable(String),
    #[error("The challenge was declined.")]
    ChallengeDeclined,
    #[error("The challenge expired.")]
    ChallengeExpired,
    #[error("No game in this channel")]
    NoSuchSession,
    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub enum SessionCommand {
    /// An admitted chat message. The guard is the channel's processing lock
    /// and is released when the actor is done with the message.
    Message {
        msg: ChatMessage,
        guard: OwnedMutexGuard<()>,
    },
    /// Accept/decline gesture on a pending draw or takeback offer.
    RespondOffer {
        user_id: String,
        accept: bool,
        reply: oneshot::Sender<bool>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    End {
        reason: EndReason,
        reply: oneshot::Sender<Option<GameSummary>>,
    },
}

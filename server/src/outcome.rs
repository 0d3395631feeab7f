//! End-of-game bookkeeping: who won, ratings, history, the final board.

use std::sync::Arc;

use chess::{Game, Side, Terminal};
use engine::OpponentEngine;

use crate::persistence::sqlite::{SqliteProfileRepository, SqliteSessionRepository};
use crate::persistence::{
    now_timestamp, GameResultKind, GameSession, GameType, Participant, ProfileRepository,
    RecentGame, ResultEntry, SessionRepository,
};
use crate::rating::{self, Outcome};
use crate::render::BoardView;
use crate::surface::ChatSurface;

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Repetition,
    Insufficient,
    FiftyMove,
    DrawAgreed,
    /// The given side resigned.
    Resign(Side),
    Timeout,
    Idle,
    /// Aborted with no winner to name: nothing is recorded, not even a
    /// history entry, since a history result must be win, loss or draw.
    Error,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Checkmate => "checkmate",
            EndReason::Stalemate => "stalemate",
            EndReason::Repetition => "repetition",
            EndReason::Insufficient => "insufficient",
            EndReason::FiftyMove => "fifty_move",
            EndReason::DrawAgreed => "draw_agreed",
            EndReason::Resign(_) => "resign",
            EndReason::Timeout => "timeout",
            EndReason::Idle => "idle",
            EndReason::Error => "error",
        }
    }

    /// Winning side, given whose move it was when the game stopped.
    pub fn winner(self, side_to_move: Side) -> Option<Side> {
        match self {
            EndReason::Checkmate | EndReason::Timeout => Some(side_to_move.opposite()),
            EndReason::Resign(side) => Some(side.opposite()),
            _ => None,
        }
    }

    /// `None` when the result does not count at all.
    pub fn outcome(self, side_to_move: Side) -> Option<Outcome> {
        if self == EndReason::Error {
            return None;
        }
        Some(match self.winner(side_to_move) {
            Some(Side::White) => Outcome::WhiteWins,
            Some(Side::Black) => Outcome::BlackWins,
            None => Outcome::Draw,
        })
    }
}

impl From<Terminal> for EndReason {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Checkmate => EndReason::Checkmate,
            Terminal::Stalemate => EndReason::Stalemate,
            Terminal::ThreefoldRepetition => EndReason::Repetition,
            Terminal::InsufficientMaterial => EndReason::Insufficient,
            Terminal::FiftyMoveRule => EndReason::FiftyMove,
        }
    }
}

/// What `finalize` did, for callers and listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub channel_id: String,
    pub reason: EndReason,
    pub outcome: Option<Outcome>,
    pub white: Participant,
    pub black: Participant,
    /// Rating changes; zero for unrated games.
    pub white_delta: i32,
    pub black_delta: i32,
    pub final_view: BoardView,
}

fn result_for(side: Side, outcome: Outcome) -> GameResultKind {
    match (outcome, side) {
        (Outcome::Draw, _) => GameResultKind::Draw,
        (Outcome::WhiteWins, Side::White) | (Outcome::BlackWins, Side::Black) => GameResultKind::Win,
        _ => GameResultKind::Loss,
    }
}

pub struct OutcomeResolver {
    sessions: SqliteSessionRepository,
    profiles: SqliteProfileRepository,
    surface: Arc<dyn ChatSurface>,
    image_base: String,
    bot_id: String,
}

impl OutcomeResolver {
    pub fn new(
        sessions: SqliteSessionRepository,
        profiles: SqliteProfileRepository,
        surface: Arc<dyn ChatSurface>,
        image_base: String,
        bot_id: String,
    ) -> Self {
        Self {
            sessions,
            profiles,
            surface,
            image_base,
            bot_id,
        }
    }

    /// Close out the game in `channel_id`. Only the first call for a session
    /// does anything; later calls, and calls for channels without a game,
    /// return `None`. The engine is stopped either way.
    #[tracing::instrument(level = "info", skip(self, game, engine), fields(reason = reason.as_str()))]
    pub async fn finalize(
        &self,
        channel_id: &str,
        reason: EndReason,
        game: Option<&Game>,
        engine: Option<Box<dyn OpponentEngine>>,
    ) -> Option<GameSummary> {
        if let Some(mut engine) = engine {
            engine.shutdown().await;
        }

        let session = match self.sessions.delete_session(channel_id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::debug!("No session to finalize");
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to remove session: {}", e);
                return None;
            }
        };

        let game = match game {
            Some(game) => game.clone(),
            None => Game::from_fen(&session.fen).unwrap_or_default(),
        };
        let outcome = reason.outcome(game.side_to_move());

        let (white_delta, black_delta) = match outcome {
            Some(outcome) => match self.record(&session, outcome).await {
                Ok(deltas) => deltas,
                Err(e) => {
                    tracing::error!("Failed to record result, ratings unchanged: {}", e);
                    (0, 0)
                }
            },
            None => (0, 0),
        };

        let final_view = BoardView::new(&session, &game, Some(reason), &self.image_base);
        self.show_final_board(&session, &final_view).await;

        tracing::info!(
            outcome = ?outcome,
            white_delta,
            black_delta,
            "Game finalized"
        );

        Some(GameSummary {
            channel_id: session.channel_id.clone(),
            reason,
            outcome,
            white: session.white,
            black: session.black,
            white_delta,
            black_delta,
            final_view,
        })
    }

    async fn record(
        &self,
        session: &GameSession,
        outcome: Outcome,
    ) -> Result<(i32, i32), crate::persistence::PersistenceError> {
        let played_at = now_timestamp();
        let entry = |side: Side, new_elo: Option<i32>, delta: i32| {
            let opponent = session.player(side.opposite());
            ResultEntry {
                user_id: session.player(side).id.clone(),
                new_elo,
                game: RecentGame {
                    opponent_id: opponent.id.clone(),
                    opponent_name: opponent.name.clone(),
                    result: result_for(side, outcome),
                    elo_delta: delta,
                    played_at,
                },
            }
        };

        match session.game_type {
            GameType::Pvp => {
                let white = self
                    .profiles
                    .ensure_profile(&session.white.id, &session.white.name)
                    .await?;
                let black = self
                    .profiles
                    .ensure_profile(&session.black.id, &session.black.name)
                    .await?;
                let (white_delta, black_delta) = rating::rate(white.elo, black.elo, outcome);

                self.profiles
                    .record_results(&[
                        entry(Side::White, Some(white.elo + white_delta), white_delta),
                        entry(Side::Black, Some(black.elo + black_delta), black_delta),
                    ])
                    .await?;
                Ok((white_delta, black_delta))
            }
            GameType::Pve => {
                let human = if session.white.id == self.bot_id {
                    Side::Black
                } else {
                    Side::White
                };
                self.profiles
                    .record_results(&[entry(human, None, 0)])
                    .await?;
                Ok((0, 0))
            }
        }
    }

    async fn show_final_board(&self, session: &GameSession, view: &BoardView) {
        let shown = match &session.display_message_id {
            Some(id) => self.surface.edit_board(&session.channel_id, id, view).await,
            None => self.surface.post_board(&session.channel_id, view).await.map(|_| ()),
        };
        if let Err(e) = shown {
            tracing::warn!("Failed to render final board: {}", e);
        }
    }
}

/// Bot seats carry the tier in their name, e.g. "Bot (rookie)".
pub fn bot_name(difficulty: engine::Difficulty) -> String {
    format!("Bot ({})", difficulty)
}

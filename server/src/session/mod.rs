//! Running games: one actor task per channel, plus the manager that starts,
//! routes to and ends them.

pub mod actor;
pub mod commands;
pub mod handle;
pub mod snapshot;
pub mod state;


use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chess::{Game, Side};
use engine::{Difficulty, EngineLauncher, OpponentEngine};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::outcome::{bot_name, EndReason, GameSummary, OutcomeResolver};
use crate::persistence::sqlite::{SqliteProfileRepository, SqliteSessionRepository};
use crate::persistence::{
    now_timestamp, GameSession, GameType, Participant, PersistenceError, ProfileRepository,
    RecentGame, SessionRepository,
};
use crate::render::BoardView;
use crate::surface::{ChatSurface, MessageId};
use actor::{run_session_actor, ActorContext};
pub use commands::SessionError;
pub use handle::SessionHandle;
pub use snapshot::SessionSnapshot;
use state::SessionState;

/// A chat user as the platform reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub bot: bool,
}

impl ChatUser {
    pub fn human(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    fn participant(&self) -> Participant {
        Participant::new(self.id.clone(), self.name.clone())
    }
}

/// An incoming chat message in a channel.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel_id: String,
    pub message_id: MessageId,
    pub author: ChatUser,
    pub content: String,
}

/// Colour the challenger asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPreference {
    White,
    Black,
    #[default]
    Random,
}

impl ColorPreference {
    /// The challenger's side; `Random` flips a fair coin.
    pub fn resolve(self) -> Side {
        match self {
            ColorPreference::White => Side::White,
            ColorPreference::Black => Side::Black,
            ColorPreference::Random => {
                if rand::random::<bool>() {
                    Side::White
                } else {
                    Side::Black
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown colour '{0}', expected white, black or random")]
pub struct ParseColorError(String);

impl FromStr for ColorPreference {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(ColorPreference::White),
            "black" => Ok(ColorPreference::Black),
            "random" => Ok(ColorPreference::Random),
            other => Err(ParseColorError(other.to_string())),
        }
    }
}

impl fmt::Display for ColorPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorPreference::White => "white",
            ColorPreference::Black => "black",
            ColorPreference::Random => "random",
        })
    }
}

/// A request to start a game: against `opponent`, or against the bot at
/// `difficulty` when no opponent is named.
#[derive(Debug, Clone)]
pub struct GameRequest {
    pub channel_id: String,
    pub challenger: ChatUser,
    pub opponent: Option<ChatUser>,
    pub difficulty: Option<Difficulty>,
    pub color: ColorPreference,
}

/// Public profile numbers for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub user_id: String,
    pub display_name: String,
    pub elo: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total: u32,
    /// Percentage of games won, 0 when none were played.
    pub win_rate: f64,
}

struct PendingChallenge {
    challenger_id: String,
    opponent_id: String,
    responder: Option<oneshot::Sender<bool>>,
}

struct Shared {
    config: SessionConfig,
    sessions: SqliteSessionRepository,
    profiles: SqliteProfileRepository,
    surface: Arc<dyn ChatSurface>,
    launcher: Arc<dyn EngineLauncher>,
    resolver: Arc<OutcomeResolver>,
    live: RwLock<HashMap<String, SessionHandle>>,
    challenges: Mutex<HashMap<String, PendingChallenge>>,
    ended_tx: broadcast::Sender<GameSummary>,
}

/// Manages all games. Spawns an actor task per channel.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        sessions: SqliteSessionRepository,
        profiles: SqliteProfileRepository,
        surface: Arc<dyn ChatSurface>,
        launcher: Arc<dyn EngineLauncher>,
    ) -> Self {
        let resolver = Arc::new(OutcomeResolver::new(
            sessions.clone(),
            profiles.clone(),
            surface.clone(),
            config.image_base.clone(),
            config.bot_id.clone(),
        ));
        let (ended_tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(Shared {
                config,
                sessions,
                profiles,
                surface,
                launcher,
                resolver,
                live: RwLock::new(HashMap::new()),
                challenges: Mutex::new(HashMap::new()),
                ended_tx,
            }),
        }
    }

    /// Summaries of every game that ends from now on.
    pub fn subscribe_endings(&self) -> broadcast::Receiver<GameSummary> {
        self.shared.ended_tx.subscribe()
    }

    /// Validate the request, run the challenge (PvP) or start the engine
    /// (PvE), persist the session and spawn its actor.
    #[tracing::instrument(level = "info", skip(self, request), fields(channel = %request.channel_id))]
    pub async fn start_game(&self, request: GameRequest) -> Result<GameSession, SessionError> {
        let GameRequest {
            channel_id,
            challenger,
            opponent,
            difficulty,
            color,
        } = request;

        if let Some(opponent) = &opponent {
            if difficulty.is_some() {
                return Err(SessionError::DifficultyWithOpponent);
            }
            if opponent.bot {
                return Err(SessionError::BotOpponent);
            }
            if opponent.id == challenger.id {
                return Err(SessionError::SelfChallenge);
            }
        } else if difficulty.is_none() {
            return Err(SessionError::DifficultyRequired);
        }

        self.ensure_channel_free(&channel_id).await?;
        self.ensure_not_busy(&challenger).await?;

        let challenger_side = color.resolve();
        let (session, engine, bot_side) = match (opponent, difficulty) {
            (Some(opponent), _) => {
                self.ensure_not_busy(&opponent).await?;
                self.await_challenge(&channel_id, &challenger, &opponent).await?;
                let (white, black) = seat(challenger.participant(), opponent.participant(), challenger_side);
                (new_session(&channel_id, GameType::Pvp, white, black, None), None, None)
            }
            (None, Some(difficulty)) => {
                let engine = self
                    .shared
                    .launcher
                    .launch(difficulty)
                    .await
                    .map_err(|e| SessionError::EngineUnavailable(e.to_string()))?;
                let bot = Participant::new(self.shared.config.bot_id.clone(), bot_name(difficulty));
                let (white, black) = seat(challenger.participant(), bot, challenger_side);
                let session =
                    new_session(&channel_id, GameType::Pve, white, black, Some(difficulty));
                (session, Some(engine), Some(challenger_side.opposite()))
            }
            (None, None) => return Err(SessionError::DifficultyRequired),
        };

        self.create(session, engine, bot_side).await
    }

    async fn create(
        &self,
        mut session: GameSession,
        engine: Option<Box<dyn OpponentEngine>>,
        bot_side: Option<Side>,
    ) -> Result<GameSession, SessionError> {
        let shared = &self.shared;
        let humans: Vec<Participant> = session
            .humans(&shared.config.bot_id)
            .into_iter()
            .cloned()
            .collect();
        let human_ids: Vec<&str> = humans.iter().map(|p| p.id.as_str()).collect();

        if let Err(e) = shared.sessions.insert_session(&session, &human_ids).await {
            if let Some(mut engine) = engine {
                engine.shutdown().await;
            }
            return Err(match e {
                PersistenceError::ChannelOccupied(_) => SessionError::ChannelOccupied,
                PersistenceError::PlayerBusy(id) => {
                    let name = humans
                        .iter()
                        .find(|p| p.id == id)
                        .map(|p| p.name.clone())
                        .unwrap_or(id);
                    SessionError::PlayerBusy(name)
                }
                other => SessionError::Persistence(other),
            });
        }

        for human in &humans {
            if let Err(e) = shared.profiles.ensure_profile(&human.id, &human.name).await {
                tracing::warn!("Failed to create profile for {}: {}", human.id, e);
            }
        }

        let game = Game::new();
        let view = BoardView::new(&session, &game, None, &shared.config.image_base);
        match shared.surface.post_board(&session.channel_id, &view).await {
            Ok(id) => {
                if let Err(e) = shared.sessions.set_display_message(&session.channel_id, &id).await {
                    tracing::warn!("Failed to save board message id: {}", e);
                }
                session.display_message_id = Some(id);
            }
            Err(e) => tracing::warn!("Failed to post board: {}", e),
        }
        if session.game_type == GameType::Pvp {
            let text = format!("Game started! **{}** is White.", session.white.name);
            if let Err(e) = shared.surface.say(&session.channel_id, &text).await {
                tracing::warn!("Failed to announce game: {}", e);
            }
        }

        tracing::info!(
            game_type = session.game_type.as_str(),
            white = %session.white.id,
            black = %session.black.id,
            "Game started"
        );
        self.spawn_actor(session.clone(), game, engine, bot_side).await;
        Ok(session)
    }

    async fn spawn_actor(
        &self,
        session: GameSession,
        game: Game,
        engine: Option<Box<dyn OpponentEngine>>,
        bot_side: Option<Side>,
    ) {
        let shared = self.shared.clone();
        let channel_id = session.channel_id.clone();
        let state = SessionState::new(
            session,
            game,
            bot_side,
            shared.config.idle_timeout,
            shared.config.game_timeout,
        );

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (turn_tx, turn_rx) = watch::channel(state.turn_of());
        let handle = SessionHandle::new(
            Uuid::new_v4().to_string(),
            channel_id.clone(),
            cmd_tx,
            turn_rx,
        );
        let handle_id = handle.id().to_string();
        shared.live.write().await.insert(channel_id.clone(), handle);

        let ctx = ActorContext {
            surface: shared.surface.clone(),
            sessions: shared.sessions.clone(),
            resolver: shared.resolver.clone(),
            image_base: shared.config.image_base.clone(),
            offer_timeout: shared.config.offer_timeout,
            takeback_enabled: shared.config.takeback_enabled,
        };

        tokio::spawn(async move {
            let exit = run_session_actor(state, engine, ctx, cmd_rx, turn_tx).await;
            {
                let mut live = shared.live.write().await;
                if live.get(&channel_id).is_some_and(|h| h.id() == handle_id) {
                    live.remove(&channel_id);
                }
            }
            if let Some(summary) = &exit.summary {
                let _ = shared.ended_tx.send(summary.clone());
            }
            if let Some(reply) = exit.reply {
                let _ = reply.send(exit.summary);
            }
        });
    }

    async fn ensure_channel_free(&self, channel_id: &str) -> Result<(), SessionError> {
        if self.shared.challenges.lock().await.contains_key(channel_id)
            || self.shared.live.read().await.contains_key(channel_id)
            || self.shared.sessions.get_session(channel_id).await?.is_some()
        {
            return Err(SessionError::ChannelOccupied);
        }
        Ok(())
    }

    async fn ensure_not_busy(&self, user: &ChatUser) -> Result<(), SessionError> {
        let challenged = self
            .shared
            .challenges
            .lock()
            .await
            .values()
            .any(|c| c.challenger_id == user.id || c.opponent_id == user.id);
        if challenged || self.shared.sessions.session_for_player(&user.id).await?.is_some() {
            return Err(SessionError::PlayerBusy(user.name.clone()));
        }
        Ok(())
    }

    /// Post the challenge and wait for the opponent's answer.
    async fn await_challenge(
        &self,
        channel_id: &str,
        challenger: &ChatUser,
        opponent: &ChatUser,
    ) -> Result<(), SessionError> {
        let shared = &self.shared;
        let (tx, rx) = oneshot::channel();
        {
            let mut challenges = shared.challenges.lock().await;
            if challenges.contains_key(channel_id) {
                return Err(SessionError::ChannelOccupied);
            }
            challenges.insert(
                channel_id.to_string(),
                PendingChallenge {
                    challenger_id: challenger.id.clone(),
                    opponent_id: opponent.id.clone(),
                    responder: Some(tx),
                },
            );
        }

        let prompt = match shared
            .surface
            .post_challenge(channel_id, &challenger.participant(), &opponent.participant())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to post challenge: {}", e);
                None
            }
        };
        tracing::info!(opponent = %opponent.id, "Challenge posted");

        let answer = tokio::time::timeout(shared.config.challenge_timeout, rx).await;
        shared.challenges.lock().await.remove(channel_id);

        let (result, text) = match answer {
            Ok(Ok(true)) => (Ok(()), "Challenge accepted!"),
            Ok(Ok(false)) => (Err(SessionError::ChallengeDeclined), "The challenge was declined."),
            Ok(Err(_)) | Err(_) => (Err(SessionError::ChallengeExpired), "The challenge expired."),
        };
        if let Some(id) = prompt {
            if let Err(e) = shared.surface.close_prompt(channel_id, &id, text).await {
                tracing::warn!("Failed to close challenge: {}", e);
            }
        }
        result
    }

    /// Accept or decline the challenge waiting in `channel_id`. Only the
    /// challenged user can answer; returns whether the answer was taken.
    pub async fn respond_challenge(&self, channel_id: &str, user_id: &str, accept: bool) -> bool {
        let mut challenges = self.shared.challenges.lock().await;
        let Some(challenge) = challenges.get_mut(channel_id) else {
            return false;
        };
        if challenge.opponent_id != user_id {
            return false;
        }
        match challenge.responder.take() {
            Some(responder) => responder.send(accept).is_ok(),
            None => false,
        }
    }

    /// Route a chat message to the game in its channel. Returns whether it
    /// was admitted.
    pub async fn dispatch_message(&self, msg: ChatMessage) -> bool {
        let handle = self.shared.live.read().await.get(&msg.channel_id).cloned();
        match handle {
            Some(handle) => handle.submit_message(msg).await,
            None => false,
        }
    }

    pub async fn respond_offer(&self, channel_id: &str, user_id: &str, accept: bool) -> bool {
        match self.get_handle(channel_id).await {
            Some(handle) => handle.respond_offer(user_id, accept).await,
            None => false,
        }
    }

    pub async fn get_handle(&self, channel_id: &str) -> Option<SessionHandle> {
        self.shared.live.read().await.get(channel_id).cloned()
    }

    pub async fn snapshot(&self, channel_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.get_handle(channel_id)
            .await
            .ok_or(SessionError::NoSuchSession)?
            .get_snapshot()
            .await
    }

    /// End the game in `channel_id`. Stored sessions without a running actor
    /// are finalized directly.
    pub async fn end_session(&self, channel_id: &str, reason: EndReason) -> Option<GameSummary> {
        if let Some(handle) = self.get_handle(channel_id).await {
            return handle.end(reason).await;
        }
        let summary = self.shared.resolver.finalize(channel_id, reason, None, None).await;
        if let Some(summary) = &summary {
            let _ = self.shared.ended_tx.send(summary.clone());
        }
        summary
    }

    pub async fn active_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.shared.live.read().await.keys().cloned().collect();
        channels.sort();
        channels
    }

    /// End every running game with `error`.
    pub async fn shutdown_all(&self) {
        let handles: Vec<SessionHandle> = self.shared.live.read().await.values().cloned().collect();
        tracing::info!(count = handles.len(), "Ending all games");
        for handle in handles {
            handle.end(EndReason::Error).await;
        }
    }

    /// Finalize stored sessions left behind by a previous run. Their engines
    /// and timers are gone, so the result does not count.
    ///
    /// Only sessions older than the TTL are touched: a younger row may belong
    /// to another process sharing the data directory.
    pub async fn recover_orphans(&self) -> Result<usize, SessionError> {
        let cutoff = now_timestamp().saturating_sub(self.shared.config.session_ttl.as_secs());
        let stored = self.shared.sessions.list_sessions().await?;
        let mut recovered = 0;
        for session in stored.into_iter().filter(|s| s.created_at < cutoff) {
            if self.get_handle(&session.channel_id).await.is_some() {
                continue;
            }
            tracing::info!(channel = %session.channel_id, "Finalizing orphaned session");
            if self.end_session(&session.channel_id, EndReason::Error).await.is_some() {
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// End sessions older than the configured TTL. Returns their channels.
    pub async fn sweep_expired(&self) -> Result<Vec<String>, SessionError> {
        let cutoff = now_timestamp().saturating_sub(self.shared.config.session_ttl.as_secs());
        let stored = self.shared.sessions.list_sessions().await?;
        let mut swept = Vec::new();
        for session in stored.into_iter().filter(|s| s.created_at < cutoff) {
            tracing::info!(channel = %session.channel_id, "Sweeping expired session");
            self.end_session(&session.channel_id, EndReason::Error).await;
            swept.push(session.channel_id);
        }
        Ok(swept)
    }

    /// Background task running `sweep_expired` periodically.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let manager = self.clone();
        let period = (self.shared.config.session_ttl / 4).max(std::time::Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(e) = manager.sweep_expired().await {
                    tracing::warn!("Session sweep failed: {}", e);
                }
            }
        })
    }

    pub async fn profile(&self, user_id: &str) -> Result<Option<ProfileView>, SessionError> {
        let Some(profile) = self.shared.profiles.load_profile(user_id).await? else {
            return Ok(None);
        };
        let total = profile.wins + profile.losses + profile.draws;
        let win_rate = if total == 0 {
            0.0
        } else {
            f64::from(profile.wins) * 100.0 / f64::from(total)
        };
        Ok(Some(ProfileView {
            user_id: profile.user_id,
            display_name: profile.display_name,
            elo: profile.elo,
            wins: profile.wins,
            losses: profile.losses,
            draws: profile.draws,
            total,
            win_rate,
        }))
    }

    /// Newest first, at most ten.
    pub async fn recent_games(&self, user_id: &str) -> Result<Vec<RecentGame>, SessionError> {
        Ok(self.shared.profiles.recent_games(user_id).await?)
    }
}

fn seat(challenger: Participant, other: Participant, challenger_side: Side) -> (Participant, Participant) {
    match challenger_side {
        Side::White => (challenger, other),
        Side::Black => (other, challenger),
    }
}

fn new_session(
    channel_id: &str,
    game_type: GameType,
    white: Participant,
    black: Participant,
    difficulty: Option<Difficulty>,
) -> GameSession {
    GameSession {
        channel_id: channel_id.to_string(),
        display_message_id: None,
        fen: chess::STARTING_FEN.to_string(),
        game_type,
        white,
        black,
        difficulty: difficulty.map(|d| d.as_str().to_string()),
        created_at: now_timestamp(),
    }
}

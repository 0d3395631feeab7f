use std::sync::Arc;

use chess::{classify_input, InputKind, Side};
use engine::OpponentEngine;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Duration, Instant};
use tracing::Instrument;

use super::commands::*;
use super::state::{PendingOffer, SessionState};
use super::ChatMessage;
use crate::outcome::{EndReason, GameSummary, OutcomeResolver};
use crate::persistence::sqlite::SqliteSessionRepository;
use crate::persistence::{GameType, SessionRepository};
use crate::render::BoardView;
use crate::surface::{ChatSurface, OfferKind};

/// Shared services an actor talks to.
#[derive(Clone)]
pub(crate) struct ActorContext {
    pub surface: Arc<dyn ChatSurface>,
    pub sessions: SqliteSessionRepository,
    pub resolver: Arc<OutcomeResolver>,
    pub image_base: String,
    pub offer_timeout: Duration,
    pub takeback_enabled: bool,
}

/// What the actor leaves behind for the manager.
pub(crate) struct ActorExit {
    pub summary: Option<GameSummary>,
    pub reply: Option<oneshot::Sender<Option<GameSummary>>>,
}

type EndReply = Option<oneshot::Sender<Option<GameSummary>>>;

enum Flow {
    Continue,
    End(EndReason, EndReply),
}

/// The main session actor loop.
/// Owns the game, the engine and every timer. Processes commands sequentially.
pub(crate) async fn run_session_actor(
    state: SessionState,
    engine: Option<Box<dyn OpponentEngine>>,
    ctx: ActorContext,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    turn_tx: watch::Sender<Option<String>>,
) -> ActorExit {
    let channel_id = state.channel_id().to_string();
    let actor = SessionActor {
        state,
        engine,
        ctx,
        turn_tx,
    };
    actor
        .run(cmd_rx)
        .instrument(tracing::info_span!("session", channel = %channel_id))
        .await
}

struct SessionActor {
    state: SessionState,
    engine: Option<Box<dyn OpponentEngine>>,
    ctx: ActorContext,
    turn_tx: watch::Sender<Option<String>>,
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCommand>) -> ActorExit {
        tracing::info!("Session actor started");

        // The bot may hold White.
        let mut flow = if self.state.bot_to_move() {
            self.engine_turn().await
        } else {
            Flow::Continue
        };

        let (reason, reply) = loop {
            if let Flow::End(reason, reply) = flow {
                break (reason, reply);
            }
            let game_deadline = self.state.game_deadline;
            let idle_deadline = self.state.idle_deadline;
            let offer_deadline = self.state.offer_deadline();

            flow = tokio::select! {
                biased;

                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        tracing::warn!("Command channel closed");
                        Flow::End(EndReason::Error, None)
                    }
                },

                _ = time::sleep_until(game_deadline) => {
                    tracing::info!("Game clock ran out");
                    Flow::End(EndReason::Timeout, None)
                }

                _ = time::sleep_until(idle_deadline) => {
                    tracing::info!("No activity, ending game");
                    Flow::End(EndReason::Idle, None)
                }

                _ = sleep_until_opt(offer_deadline) => {
                    self.expire_offer().await;
                    Flow::Continue
                }
            };
        };

        self.finish(reason, reply).await
    }

    async fn finish(mut self, reason: EndReason, reply: EndReply) -> ActorExit {
        self.turn_tx.send_replace(None);
        if let Some(offer) = self.state.pending_offer.take() {
            if let Some(id) = &offer.prompt_id {
                self.close_prompt(id, "Offer withdrawn.").await;
            }
        }

        let summary = self
            .ctx
            .resolver
            .finalize(
                self.state.channel_id(),
                reason,
                Some(&self.state.game),
                self.engine.take(),
            )
            .await;
        tracing::info!(reason = reason.as_str(), "Session actor exited");
        ActorExit { summary, reply }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> Flow {
        match cmd {
            SessionCommand::Message { msg, guard } => {
                let flow = self.handle_message(msg).await;
                drop(guard);
                flow
            }
            SessionCommand::RespondOffer {
                user_id,
                accept,
                reply,
            } => {
                let (handled, flow) = self.respond_offer(&user_id, accept).await;
                let _ = reply.send(handled);
                flow
            }
            SessionCommand::GetSnapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
                Flow::Continue
            }
            SessionCommand::End { reason, reply } => Flow::End(reason, Some(reply)),
        }
    }

    async fn handle_message(&mut self, msg: ChatMessage) -> Flow {
        // The turn may have changed between admission and now.
        if self.state.turn_of().as_deref() != Some(msg.author.id.as_str()) {
            return Flow::Continue;
        }
        let Some(side) = self.state.session.side_of(&msg.author.id) else {
            return Flow::Continue;
        };

        let kind = classify_input(&msg.content);
        if kind == InputKind::Unrecognized {
            return Flow::Continue;
        }
        self.state.touch();
        self.delete_input(&msg).await;

        match kind {
            InputKind::Resign => {
                tracing::info!(side = side.as_str(), "Player resigned");
                Flow::End(EndReason::Resign(side), None)
            }
            InputKind::Draw => {
                self.offer(OfferKind::Draw, side, &msg.author.id).await;
                Flow::Continue
            }
            InputKind::Takeback => {
                self.offer(OfferKind::Takeback, side, &msg.author.id).await;
                Flow::Continue
            }
            InputKind::Move(text) => self.human_move(&msg.author.id, &text).await,
            InputKind::Unrecognized => Flow::Continue,
        }
    }

    async fn human_move(&mut self, user_id: &str, text: &str) -> Flow {
        let san = match self.state.game.play_text(text) {
            Ok(entry) => entry.san.clone(),
            Err(e) => {
                tracing::debug!(input = text, "Rejected move: {}", e);
                self.notify(user_id, &format!("`{}` is not a valid move.", text))
                    .await;
                return Flow::Continue;
            }
        };
        tracing::debug!(san = %san, "Move played");

        self.withdraw_offer().await;
        if let Some(flow) = self.after_move().await {
            return flow;
        }

        if self.state.bot_to_move() {
            self.engine_turn().await
        } else {
            Flow::Continue
        }
    }

    /// Ask the engine for its move and play it.
    async fn engine_turn(&mut self) -> Flow {
        self.publish_turn();
        let Some(engine) = self.engine.as_mut() else {
            tracing::error!("Bot to move but no engine attached");
            return Flow::End(EndReason::Error, None);
        };

        let fen = self.state.game.to_fen();
        let mv = match engine.request_move(&fen).await {
            Ok(mv) => mv,
            Err(e) => {
                tracing::error!("Engine failed: {}", e);
                return Flow::End(EndReason::Error, None);
            }
        };
        match self.state.game.make_move(mv) {
            Ok(entry) => tracing::debug!(san = %entry.san, "Engine moved"),
            Err(e) => {
                tracing::error!("Engine played an illegal move {}: {}", mv, e);
                return Flow::End(EndReason::Error, None);
            }
        }
        self.state.touch();

        self.after_move().await.unwrap_or(Flow::Continue)
    }

    /// Persist, check for the end of the game, redraw. `Some` ends the game.
    async fn after_move(&mut self) -> Option<Flow> {
        self.persist_position().await;
        if let Some(terminal) = self.state.game.terminal() {
            tracing::info!(?terminal, "Game over on the board");
            return Some(Flow::End(EndReason::from(terminal), None));
        }
        self.refresh_board().await;
        self.publish_turn();
        None
    }

    async fn offer(&mut self, kind: OfferKind, side: Side, user_id: &str) {
        if self.state.session.game_type == GameType::Pve {
            let text = match kind {
                OfferKind::Draw => "The bot declines your draw offer. The fight must continue!",
                OfferKind::Takeback => "You cannot take back a move against the bot.",
            };
            self.notify(user_id, text).await;
            return;
        }
        if self.state.pending_offer.is_some() {
            self.notify(user_id, "There is already an offer waiting for an answer.")
                .await;
            return;
        }
        if kind == OfferKind::Takeback {
            if !self.ctx.takeback_enabled {
                self.notify(user_id, "Takebacks are disabled.").await;
                return;
            }
            if self.state.game.history().len() < 2 {
                self.notify(user_id, "Not enough moves have been made to take back.")
                    .await;
                return;
            }
        }

        let from = self.state.participant(side).clone();
        let to = self.state.participant(side.opposite()).clone();
        let prompt_id = match self
            .ctx
            .surface
            .post_offer(self.state.channel_id(), kind, &from, &to)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to post {} offer: {}", kind.as_str(), e);
                None
            }
        };
        tracing::info!(kind = kind.as_str(), from = side.as_str(), "Offer made");
        self.state.pending_offer = Some(PendingOffer {
            kind,
            from: side,
            prompt_id,
            expires_at: Instant::now() + self.ctx.offer_timeout,
        });
    }

    /// Returns whether the gesture was accepted as an answer to the offer.
    async fn respond_offer(&mut self, user_id: &str, accept: bool) -> (bool, Flow) {
        let answerer = self.state.session.side_of(user_id);
        let Some(offer) = self.state.pending_offer.as_ref() else {
            return (false, Flow::Continue);
        };
        if answerer != Some(offer.from.opposite()) {
            return (false, Flow::Continue);
        }
        let Some(offer) = self.state.pending_offer.take() else {
            return (false, Flow::Continue);
        };
        self.state.touch();

        let text = if accept {
            offer.accepted_text()
        } else {
            offer.declined_text()
        };
        if let Some(id) = &offer.prompt_id {
            self.close_prompt(id, text).await;
        }
        tracing::info!(kind = offer.kind.as_str(), accept, "Offer answered");

        if !accept {
            return (true, Flow::Continue);
        }
        match offer.kind {
            OfferKind::Draw => (true, Flow::End(EndReason::DrawAgreed, None)),
            OfferKind::Takeback => {
                if let Err(e) = self.state.game.undo(2) {
                    tracing::warn!("Takeback failed: {}", e);
                    return (true, Flow::Continue);
                }
                self.persist_position().await;
                self.refresh_board().await;
                self.publish_turn();
                (true, Flow::Continue)
            }
        }
    }

    async fn expire_offer(&mut self) {
        if let Some(offer) = self.state.pending_offer.take() {
            tracing::debug!(kind = offer.kind.as_str(), "Offer expired");
            if let Some(id) = &offer.prompt_id {
                self.close_prompt(id, offer.expired_text()).await;
            }
        }
    }

    async fn withdraw_offer(&mut self) {
        if let Some(offer) = self.state.pending_offer.take() {
            if let Some(id) = &offer.prompt_id {
                self.close_prompt(id, "Offer withdrawn.").await;
            }
        }
    }

    fn publish_turn(&self) {
        self.turn_tx.send_replace(self.state.turn_of());
    }

    async fn persist_position(&self) {
        let fen = self.state.game.to_fen();
        if let Err(e) = self
            .ctx
            .sessions
            .update_position(self.state.channel_id(), &fen)
            .await
        {
            tracing::warn!("Failed to save position, continuing in memory: {}", e);
        }
    }

    /// Redraw the board message, posting a fresh one if the old is gone.
    async fn refresh_board(&mut self) {
        let view = BoardView::new(
            &self.state.session,
            &self.state.game,
            None,
            &self.ctx.image_base,
        );
        let channel_id = self.state.session.channel_id.clone();

        if let Some(id) = &self.state.session.display_message_id {
            match self.ctx.surface.edit_board(&channel_id, id, &view).await {
                Ok(()) => return,
                Err(e) => tracing::warn!("Failed to edit board, posting a new one: {}", e),
            }
        }

        match self.ctx.surface.post_board(&channel_id, &view).await {
            Ok(id) => {
                if let Err(e) = self.ctx.sessions.set_display_message(&channel_id, &id).await {
                    tracing::warn!("Failed to save board message id: {}", e);
                }
                self.state.session.display_message_id = Some(id);
            }
            Err(e) => tracing::warn!("Failed to post board: {}", e),
        }
    }

    async fn delete_input(&self, msg: &ChatMessage) {
        if let Err(e) = self
            .ctx
            .surface
            .delete_message(&msg.channel_id, &msg.message_id)
            .await
        {
            tracing::debug!("Could not delete input message: {}", e);
        }
    }

    async fn notify(&self, user_id: &str, text: &str) {
        if let Err(e) = self
            .ctx
            .surface
            .notify(self.state.channel_id(), user_id, text)
            .await
        {
            tracing::warn!("Failed to notify {}: {}", user_id, e);
        }
    }

    async fn close_prompt(&self, message_id: &str, text: &str) {
        if let Err(e) = self
            .ctx
            .surface
            .close_prompt(self.state.channel_id(), message_id, text)
            .await
        {
            tracing::warn!("Failed to close prompt: {}", e);
        }
    }
}

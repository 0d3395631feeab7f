use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Mutex};

use super::commands::*;
use super::snapshot::SessionSnapshot;
use super::ChatMessage;
use crate::outcome::{EndReason, GameSummary};

/// Cheap, cloneable handle to a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    channel_id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
    turn_rx: watch::Receiver<Option<String>>,
    lock: Arc<Mutex<()>>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: String,
        channel_id: String,
        cmd_tx: mpsc::Sender<SessionCommand>,
        turn_rx: watch::Receiver<Option<String>>,
    ) -> Self {
        Self {
            id,
            channel_id,
            cmd_tx,
            turn_rx,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Unique per actor; a channel can host many games over time.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Chat id of the player to move, or `None` while the bot thinks.
    pub fn turn_of(&self) -> Option<String> {
        self.turn_rx.borrow().clone()
    }

    /// Hand a chat message to the actor. Messages from bots, from anyone but
    /// the player to move, or arriving while the previous one is still being
    /// handled are dropped and `false` is returned.
    pub async fn submit_message(&self, msg: ChatMessage) -> bool {
        if msg.author.bot {
            return false;
        }
        if self.turn_rx.borrow().as_deref() != Some(msg.author.id.as_str()) {
            return false;
        }
        let Ok(guard) = self.lock.clone().try_lock_owned() else {
            tracing::debug!(channel = %self.channel_id, "Busy, dropping message");
            return false;
        };
        self.cmd_tx
            .send(SessionCommand::Message { msg, guard })
            .await
            .is_ok()
    }

    pub async fn respond_offer(&self, user_id: &str, accept: bool) -> bool {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .cmd_tx
            .send(SessionCommand::RespondOffer {
                user_id: user_id.to_string(),
                accept,
                reply: tx,
            })
            .await;
        sent.is_ok() && rx.await.unwrap_or(false)
    }

    pub async fn get_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| SessionError::Internal("Reply dropped".into()))
    }

    /// Ask the actor to end the game. `None` when it already ended.
    pub async fn end(&self, reason: EndReason) -> Option<GameSummary> {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::End { reason, reply: tx })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::NoSuchSession)
    }
}

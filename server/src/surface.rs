//! The chat platform as seen by the game service.
//!
//! Everything the service shows to people goes through [`ChatSurface`]. A
//! platform adapter implements it and forwards incoming messages and button
//! presses to `SessionManager`. Failures are reported but never fatal: the
//! stored position stays authoritative and the next render repairs the view.

use async_trait::async_trait;

use crate::persistence::Participant;
use crate::render::BoardView;

pub type MessageId = String;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Message not found: {0}")]
    NotFound(MessageId),
    #[error("Chat platform error: {0}")]
    Platform(String),
}

/// The two things one player can ask of the other mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferKind {
    Draw,
    Takeback,
}

impl OfferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OfferKind::Draw => "draw",
            OfferKind::Takeback => "takeback",
        }
    }
}

#[async_trait]
pub trait ChatSurface: Send + Sync {
    async fn post_board(&self, channel_id: &str, view: &BoardView) -> Result<MessageId, SurfaceError>;

    async fn edit_board(
        &self,
        channel_id: &str,
        message_id: &str,
        view: &BoardView,
    ) -> Result<(), SurfaceError>;

    /// Public text message in the channel.
    async fn say(&self, channel_id: &str, text: &str) -> Result<(), SurfaceError>;

    /// A notice only `user_id` can see.
    async fn notify(&self, channel_id: &str, user_id: &str, text: &str) -> Result<(), SurfaceError>;

    /// Ask `opponent` to accept or decline a game.
    async fn post_challenge(
        &self,
        channel_id: &str,
        challenger: &Participant,
        opponent: &Participant,
    ) -> Result<MessageId, SurfaceError>;

    /// Ask `to` to accept or decline an offer made by `from`.
    async fn post_offer(
        &self,
        channel_id: &str,
        kind: OfferKind,
        from: &Participant,
        to: &Participant,
    ) -> Result<MessageId, SurfaceError>;

    /// Replace a challenge or offer prompt with a final line; its buttons go away.
    async fn close_prompt(
        &self,
        channel_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), SurfaceError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SurfaceError>;
}

#[cfg(test)]
pub use recording::{RecordingSurface, SurfaceCall};

use chess::{Game, Side};
use tokio::time::{Duration, Instant};

use super::snapshot::SessionSnapshot;
use crate::persistence::{GameSession, Participant};
use crate::render::last_move_line;
use crate::surface::{MessageId, OfferKind};

/// A draw or takeback offer waiting on the other player.
#[derive(Debug, Clone)]
pub struct PendingOffer {
    pub kind: OfferKind,
    pub from: Side,
    pub prompt_id: Option<MessageId>,
    pub expires_at: Instant,
}

impl PendingOffer {
    pub fn declined_text(&self) -> &'static str {
        match self.kind {
            OfferKind::Draw => "Draw offer declined.",
            OfferKind::Takeback => "Takeback request declined.",
        }
    }

    pub fn expired_text(&self) -> &'static str {
        match self.kind {
            OfferKind::Draw => "Draw offer expired.",
            OfferKind::Takeback => "Takeback request expired.",
        }
    }

    pub fn accepted_text(&self) -> &'static str {
        match self.kind {
            OfferKind::Draw => "Draw offer accepted.",
            OfferKind::Takeback => "Takeback accepted.",
        }
    }
}

/// Everything one running game owns. Lives inside the actor task only.
pub struct SessionState {
    pub session: GameSession,
    pub game: Game,
    /// Seat the engine plays, for games against the bot.
    pub bot_side: Option<Side>,
    pub pending_offer: Option<PendingOffer>,
    pub idle_deadline: Instant,
    pub game_deadline: Instant,
    idle_timeout: Duration,
}

impl SessionState {
    pub fn new(
        session: GameSession,
        game: Game,
        bot_side: Option<Side>,
        idle_timeout: Duration,
        game_timeout: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            session,
            game,
            bot_side,
            pending_offer: None,
            idle_deadline: now + idle_timeout,
            game_deadline: now + game_timeout,
            idle_timeout,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.session.channel_id
    }

    pub fn side_to_move(&self) -> Side {
        self.game.side_to_move()
    }

    pub fn bot_to_move(&self) -> bool {
        self.bot_side == Some(self.side_to_move())
    }

    /// Chat id of the human who may act now. `None` while the bot is to move.
    pub fn turn_of(&self) -> Option<String> {
        if self.bot_to_move() {
            None
        } else {
            Some(self.session.player(self.side_to_move()).id.clone())
        }
    }

    pub fn participant(&self, side: Side) -> &Participant {
        self.session.player(side)
    }

    /// Push the idle deadline out again.
    pub fn touch(&mut self) {
        self.idle_deadline = Instant::now() + self.idle_timeout;
    }

    pub fn offer_deadline(&self) -> Option<Instant> {
        self.pending_offer.as_ref().map(|offer| offer.expires_at)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            channel_id: self.session.channel_id.clone(),
            fen: self.game.to_fen(),
            side_to_move: self.side_to_move(),
            turn_of: self.turn_of(),
            history: self.game.history().iter().map(|h| h.san.clone()).collect(),
            last_move: last_move_line(&self.game),
            pending_offer: self
                .pending_offer
                .as_ref()
                .map(|offer| (offer.kind, offer.from)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::GameType;

    fn state(bot_side: Option<Side>) -> SessionState {
        let (white, black) = match bot_side {
            Some(Side::White) => (Participant::new("chessbot", "Bot (rookie)"), Participant::new("alice", "Alice")),
            _ => (Participant::new("alice", "Alice"), Participant::new("bob", "Bob")),
        };
        let session = GameSession {
            channel_id: "c1".to_string(),
            display_message_id: None,
            fen: chess::STARTING_FEN.to_string(),
            game_type: if bot_side.is_some() { GameType::Pve } else { GameType::Pvp },
            white,
            black,
            difficulty: None,
            created_at: 0,
        };
        SessionState::new(
            session,
            Game::new(),
            bot_side,
            Duration::from_secs(120),
            Duration::from_secs(1800),
        )
    }

    #[test]
    fn test_turn_of_follows_side_to_move() {
        let mut state = state(None);
        assert_eq!(state.turn_of().as_deref(), Some("alice"));
        state.game.play_text("e4").unwrap();
        assert_eq!(state.turn_of().as_deref(), Some("bob"));
    }

    #[test]
    fn test_bot_turn_has_no_human() {
        let mut state = state(Some(Side::White));
        assert!(state.bot_to_move());
        assert_eq!(state.turn_of(), None);
        state.game.play_text("d4").unwrap();
        assert_eq!(state.turn_of().as_deref(), Some("alice"));
    }

    #[test]
    fn test_snapshot_reports_offer() {
        let mut state = state(None);
        state.game.play_text("e4").unwrap();
        state.pending_offer = Some(PendingOffer {
            kind: OfferKind::Draw,
            from: Side::Black,
            prompt_id: None,
            expires_at: Instant::now(),
        });
        let snapshot = state.snapshot();
        assert_eq!(snapshot.last_move, "1. e4");
        assert_eq!(snapshot.history, vec!["e4".to_string()]);
        assert_eq!(snapshot.pending_offer, Some((OfferKind::Draw, Side::Black)));
        assert!(snapshot.fen.contains(" b "));
    }
}

use chess::Side;

use crate::surface::OfferKind;

/// Read-only view of a running game, taken inside the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub channel_id: String,
    pub fen: String,
    pub side_to_move: Side,
    /// Chat id of the player whose turn it is; `None` while the bot thinks.
    pub turn_of: Option<String>,
    pub history: Vec<String>,
    pub last_move: String,
    pub pending_offer: Option<(OfferKind, Side)>,
}

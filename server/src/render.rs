//! The board message: what a chat surface shows for a game.

use chess::{fen, Game, Side};

use crate::outcome::EndReason;
use crate::persistence::GameSession;

pub const DEFAULT_IMAGE_BASE: &str = "https://chessboardimage.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Check,
    Checkmate,
    Draw,
    Resigned,
    TimedOut,
    Error,
}

impl GameStatus {
    pub fn label(self) -> &'static str {
        match self {
            GameStatus::InProgress => "In Progress",
            GameStatus::Check => "Check!",
            GameStatus::Checkmate => "Checkmate!",
            GameStatus::Draw => "Draw",
            GameStatus::Resigned => "Resigned",
            GameStatus::TimedOut => "Timed Out",
            GameStatus::Error => "Error",
        }
    }
}

/// Everything a surface needs to draw the board message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub last_move: String,
    pub status: GameStatus,
    pub fen: String,
}

impl BoardView {
    pub fn new(
        session: &GameSession,
        game: &Game,
        ending: Option<EndReason>,
        image_base: &str,
    ) -> Self {
        let fen = game.to_fen();
        let to_move = game.side_to_move();
        let winner = ending
            .and_then(|reason| reason.winner(to_move))
            .map(|side| session.player(side).name.as_str())
            .unwrap_or_default();

        let (description, status) = match ending {
            None => {
                let status = if game.in_check() {
                    GameStatus::Check
                } else {
                    GameStatus::InProgress
                };
                (
                    format!(
                        "It's **{}**'s turn ({}).\nMake a move (e.g., `e4`), or type `resign`, `draw`, or `takeback`.",
                        session.player(to_move).name,
                        to_move.title()
                    ),
                    status,
                )
            }
            Some(EndReason::Checkmate) => (
                format!("**Checkmate!** {} wins.", winner),
                GameStatus::Checkmate,
            ),
            Some(EndReason::Stalemate) => (
                "**Stalemate!** The game is a draw.".to_string(),
                GameStatus::Draw,
            ),
            Some(EndReason::Repetition) => (
                "**Draw** by threefold repetition.".to_string(),
                GameStatus::Draw,
            ),
            Some(EndReason::Insufficient) => (
                "**Draw** due to insufficient material.".to_string(),
                GameStatus::Draw,
            ),
            Some(EndReason::FiftyMove) => (
                "**Draw** by the fifty-move rule.".to_string(),
                GameStatus::Draw,
            ),
            Some(EndReason::DrawAgreed) => (
                "**Game drawn by agreement.**".to_string(),
                GameStatus::Draw,
            ),
            Some(EndReason::Resign(side)) => (
                format!(
                    "**{} has resigned.** {} wins!",
                    session.player(side).name,
                    winner
                ),
                GameStatus::Resigned,
            ),
            Some(EndReason::Timeout) => (
                format!("**Time is up.** {} wins.", winner),
                GameStatus::TimedOut,
            ),
            Some(EndReason::Idle) => (
                "**Game ended due to inactivity.**".to_string(),
                GameStatus::TimedOut,
            ),
            Some(EndReason::Error) => (
                "**Game aborted.** The result does not count.".to_string(),
                GameStatus::Error,
            ),
        };

        Self {
            title: format!(
                "{} (White) vs. {} (Black)",
                session.white.name, session.black.name
            ),
            description,
            image_url: board_image_url(image_base, &fen),
            last_move: last_move_line(game),
            status,
            fen,
        }
    }
}

/// Image URL derived from the piece placement only.
pub fn board_image_url(base: &str, fen_text: &str) -> String {
    format!(
        "{}/{}.png?theme=wood",
        base.trim_end_matches('/'),
        fen::placement(fen_text)
    )
}

/// "None", "1. e4", "1. e4 e5" or "2... Nc6".
pub fn last_move_line(game: &Game) -> String {
    let history = game.history();
    let Some(last) = history.last() else {
        return "None".to_string();
    };

    match last.side {
        Side::White => format!("{}. {}", last.move_number, last.san),
        Side::Black => match history.len().checked_sub(2).map(|i| &history[i]) {
            Some(prev) if prev.side == Side::White && prev.move_number == last.move_number => {
                format!("{}. {} {}", last.move_number, prev.san, last.san)
            }
            _ => format!("{}... {}", last.move_number, last.san),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{GameType, Participant};

    fn session() -> GameSession {
        GameSession {
            channel_id: "c1".to_string(),
            display_message_id: None,
            fen: chess::STARTING_FEN.to_string(),
            game_type: GameType::Pvp,
            white: Participant::new("w", "Alice"),
            black: Participant::new("b", "Bob"),
            difficulty: None,
            created_at: 0,
        }
    }

    fn play(moves: &[&str]) -> Game {
        let mut game = Game::new();
        for mv in moves {
            game.play_text(mv).unwrap();
        }
        game
    }

    #[test]
    fn test_last_move_line() {
        assert_eq!(last_move_line(&Game::new()), "None");
        assert_eq!(last_move_line(&play(&["e4"])), "1. e4");
        assert_eq!(last_move_line(&play(&["e4", "e5"])), "1. e4 e5");

        let mut game =
            Game::from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2")
                .unwrap();
        game.play_text("Nc6").unwrap();
        assert_eq!(last_move_line(&game), "2... Nc6");
    }

    #[test]
    fn test_in_progress_view() {
        let view = BoardView::new(&session(), &play(&["e4"]), None, DEFAULT_IMAGE_BASE);
        assert_eq!(view.title, "Alice (White) vs. Bob (Black)");
        assert!(view.description.starts_with("It's **Bob**'s turn (Black)."));
        assert_eq!(view.status, GameStatus::InProgress);
        assert_eq!(
            view.image_url,
            "https://chessboardimage.com/rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR.png?theme=wood"
        );
        assert_eq!(view.fen, play(&["e4"]).to_fen());
    }

    #[test]
    fn test_check_status() {
        let game = play(&["e4", "f5", "Qh5+"]);
        let view = BoardView::new(&session(), &game, None, DEFAULT_IMAGE_BASE);
        assert_eq!(view.status, GameStatus::Check);
        assert_eq!(view.status.label(), "Check!");
    }

    #[test]
    fn test_final_views() {
        let mated = play(&["f3", "e5", "g4", "Qh4#"]);
        let view = BoardView::new(&session(), &mated, Some(EndReason::Checkmate), DEFAULT_IMAGE_BASE);
        assert_eq!(view.description, "**Checkmate!** Bob wins.");
        assert_eq!(view.status.label(), "Checkmate!");

        let view = BoardView::new(
            &session(),
            &Game::new(),
            Some(EndReason::Resign(Side::White)),
            DEFAULT_IMAGE_BASE,
        );
        assert_eq!(view.description, "**Alice has resigned.** Bob wins!");
        assert_eq!(view.status, GameStatus::Resigned);

        let view = BoardView::new(&session(), &Game::new(), Some(EndReason::Error), "https://img.test/");
        assert_eq!(view.status.label(), "Error");
        assert!(view.image_url.starts_with("https://img.test/rnbqkbnr"));
    }
}

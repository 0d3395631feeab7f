//! Terminal stand-in for a chat platform.
//!
//! Boards are printed as ASCII diagrams, private notices are tagged with
//! their recipient, and every line typed on stdin is sent as a message from
//! whoever is to move. `/accept` and `/decline` answer whatever challenge or
//! offer is waiting.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chess::{DisplayBoard, Side};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::outcome::GameSummary;
use crate::persistence::Participant;
use crate::render::BoardView;
use crate::session::{ChatMessage, ChatUser, SessionManager};
use crate::surface::{ChatSurface, MessageId, OfferKind, SurfaceError};

pub struct ConsoleSurface {
    perspective: Side,
    next_id: AtomicU64,
}

impl ConsoleSurface {
    pub fn new(perspective: Side) -> Self {
        Self {
            perspective,
            next_id: AtomicU64::new(1),
        }
    }

    fn fresh_id(&self) -> MessageId {
        format!("console-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn render(&self, view: &BoardView) -> String {
        let diagram = match DisplayBoard::from_fen(&view.fen) {
            Ok(board) => board.to_ascii(self.perspective),
            Err(e) => format!("(cannot draw board: {})\n", e),
        };
        format!(
            "== {} ==\n{}\n{}Last move: {}\nStatus: {}\nFEN: {}\n",
            view.title,
            view.description,
            diagram,
            view.last_move,
            view.status.label(),
            view.fen
        )
    }
}

#[async_trait]
impl ChatSurface for ConsoleSurface {
    async fn post_board(&self, _channel_id: &str, view: &BoardView) -> Result<MessageId, SurfaceError> {
        println!("{}", self.render(view));
        Ok(self.fresh_id())
    }

    async fn edit_board(
        &self,
        _channel_id: &str,
        _message_id: &str,
        view: &BoardView,
    ) -> Result<(), SurfaceError> {
        println!("{}", self.render(view));
        Ok(())
    }

    async fn say(&self, _channel_id: &str, text: &str) -> Result<(), SurfaceError> {
        println!("{}", text);
        Ok(())
    }

    async fn notify(&self, _channel_id: &str, user_id: &str, text: &str) -> Result<(), SurfaceError> {
        println!("[to {}] {}", user_id, text);
        Ok(())
    }

    async fn post_challenge(
        &self,
        _channel_id: &str,
        challenger: &Participant,
        opponent: &Participant,
    ) -> Result<MessageId, SurfaceError> {
        println!(
            "{}, {} challenges you to a game. Type /accept or /decline.",
            opponent.name, challenger.name
        );
        Ok(self.fresh_id())
    }

    async fn post_offer(
        &self,
        _channel_id: &str,
        kind: OfferKind,
        from: &Participant,
        to: &Participant,
    ) -> Result<MessageId, SurfaceError> {
        let what = match kind {
            OfferKind::Draw => "offers a draw",
            OfferKind::Takeback => "asks to take back the last move",
        };
        println!("{}, {} {}. Type /accept or /decline.", to.name, from.name, what);
        Ok(self.fresh_id())
    }

    async fn close_prompt(
        &self,
        _channel_id: &str,
        _message_id: &str,
        text: &str,
    ) -> Result<(), SurfaceError> {
        println!("{}", text);
        Ok(())
    }

    async fn delete_message(&self, _channel_id: &str, _message_id: &str) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// What a typed line asks for.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleLine {
    Answer(bool),
    Say(String),
    Quit,
    Blank,
}

fn parse_line(line: &str) -> ConsoleLine {
    match line.trim() {
        "" => ConsoleLine::Blank,
        "/accept" | "/yes" => ConsoleLine::Answer(true),
        "/decline" | "/no" => ConsoleLine::Answer(false),
        "/quit" | "/exit" => ConsoleLine::Quit,
        text => ConsoleLine::Say(text.to_string()),
    }
}

/// Feed stdin into the game in `channel_id` until it ends, `/quit` is typed
/// or stdin closes. `players` are the humans at this terminal.
pub async fn run_console(
    manager: &SessionManager,
    channel_id: &str,
    players: &[ChatUser],
) -> anyhow::Result<Option<GameSummary>> {
    let mut endings = manager.subscribe_endings();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut counter = 0u64;

    loop {
        tokio::select! {
            summary = endings.recv() => {
                match summary {
                    Ok(summary) if summary.channel_id == channel_id => return Ok(Some(summary)),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Lost game endings: {}", e);
                        return Ok(None);
                    }
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(manager.end_session(channel_id, crate::outcome::EndReason::Error).await);
                };
                match parse_line(&line) {
                    ConsoleLine::Blank => {}
                    ConsoleLine::Quit => {
                        return Ok(manager.end_session(channel_id, crate::outcome::EndReason::Error).await);
                    }
                    ConsoleLine::Answer(accept) => {
                        let mut answered = false;
                        for player in players {
                            answered = manager.respond_challenge(channel_id, &player.id, accept).await
                                || manager.respond_offer(channel_id, &player.id, accept).await;
                            if answered {
                                break;
                            }
                        }
                        if !answered {
                            println!("Nothing to answer.");
                        }
                    }
                    ConsoleLine::Say(content) => {
                        let Some(handle) = manager.get_handle(channel_id).await else {
                            println!("No game is running yet.");
                            continue;
                        };
                        let Some(author) = handle
                            .turn_of()
                            .and_then(|id| players.iter().find(|p| p.id == id).cloned())
                        else {
                            println!("Please wait, the bot is thinking.");
                            continue;
                        };
                        counter += 1;
                        let msg = ChatMessage {
                            channel_id: channel_id.to_string(),
                            message_id: format!("input-{}", counter),
                            author,
                            content,
                        };
                        if !manager.dispatch_message(msg).await {
                            println!("Still working on the last move, try again.");
                        }
                    }
                }
            }
        }
    }
}

use crate::{EngineInfo, Score};
use chess::parse_uci_move;
use cozy_chess::Move;

/// Incoming message from UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    BestMove { mv: Move, ponder: Option<Move> },
    /// `bestmove (none)` or `bestmove 0000`
    NoBestMove,
    Info(EngineInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => match tokens.get(1) {
            None => Err(crate::UciError::MalformedMessage(line.to_string())),
            Some(&"(none)") | Some(&"0000") => Ok(UciMessage::NoBestMove),
            Some(mv) => {
                let mv = parse_uci_move(mv)?;
                let ponder = match (tokens.get(2), tokens.get(3)) {
                    (Some(&"ponder"), Some(p)) => parse_uci_move(p).ok(),
                    _ => None,
                };
                Ok(UciMessage::BestMove { mv, ponder })
            }
        },

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse the fields of an "info" line we care about; the rest is skipped.
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let Some(&score_type) = tokens.get(i) {
                    i += 1;
                    if let Some(value_str) = tokens.get(i) {
                        info.score = match score_type {
                            "cp" => value_str.parse().ok().map(Score::Centipawns),
                            "mate" => value_str.parse().ok().map(Score::Mate),
                            _ => None,
                        };
                    }
                }
            }
            // Everything after pv or string is free-form.
            "pv" | "string" => break,
            _ => {}
        }
        i += 1;
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::format_uci_move;

    #[test]
    fn test_parse_bestmove() {
        let msg = parse_uci_message("bestmove e2e4 ponder e7e5").unwrap();
        match msg {
            UciMessage::BestMove { mv, ponder } => {
                assert_eq!(format_uci_move(mv), "e2e4");
                assert_eq!(format_uci_move(ponder.unwrap()), "e7e5");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_bestmove_none() {
        assert!(matches!(
            parse_uci_message("bestmove (none)").unwrap(),
            UciMessage::NoBestMove
        ));
        assert!(parse_uci_message("bestmove").is_err());
        assert!(parse_uci_message("bestmove zz99").is_err());
    }

    #[test]
    fn test_parse_info() {
        let msg = parse_uci_message("info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5").unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert_eq!(info.depth, Some(12));
                assert_eq!(info.score, Some(Score::Centipawns(35)));
                assert_eq!(info.nodes, Some(15234));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_handshake_lines() {
        assert!(matches!(parse_uci_message("uciok").unwrap(), UciMessage::UciOk));
        assert!(matches!(parse_uci_message("readyok").unwrap(), UciMessage::ReadyOk));
        match parse_uci_message("id name Stockfish 16").unwrap() {
            UciMessage::Id { name, value } => {
                assert_eq!(name, "name");
                assert_eq!(value, "Stockfish 16");
            }
            _ => panic!("Wrong message type"),
        }
        assert!(parse_uci_message("option name Hash type spin").is_err());
    }
}

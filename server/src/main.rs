//! chessbot: chess games for a chat channel, against another member or
//! against Stockfish.
//!
//! The binary drives the game service from a terminal: `play` and `duel`
//! run a game with the console standing in for the chat platform, the other
//! subcommands inspect the stored profiles and sessions.

mod config;
mod console;
mod outcome;
mod persistence;
mod rating;
mod render;
mod session;
mod surface;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chess::Side;
use clap::{Parser, Subcommand};
use engine::{Difficulty, StockfishLauncher};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use console::{run_console, ConsoleSurface};
use outcome::GameSummary;
use persistence::sqlite::{Database, SqliteProfileRepository, SqliteSessionRepository};
use persistence::{now_timestamp, SessionRepository};
use session::{ChatUser, ColorPreference, GameRequest, SessionManager};

const CONSOLE_CHANNEL: &str = "console";

#[derive(Parser)]
#[command(name = "chessbot", about = "Chess games for chat channels, with Elo ratings")]
struct Cli {
    /// Override the data directory (default: CHESSBOT_DATA_DIR or the platform data dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play against the engine in this terminal.
    Play {
        /// rookie, intermediate, experienced, professional or grandmaster.
        #[arg(short, long)]
        difficulty: Difficulty,
        /// white, black or random.
        #[arg(short, long, default_value = "random")]
        color: ColorPreference,
        #[arg(short, long, default_value = "Player")]
        name: String,
    },
    /// Two people sharing this terminal. The first name issues the challenge.
    Duel {
        #[arg(long)]
        white_name: String,
        #[arg(long)]
        black_name: String,
        /// Colour for the challenger; `random` may swap the seats.
        #[arg(short, long, default_value = "white")]
        color: ColorPreference,
    },
    /// Show a player's rating and record.
    Profile {
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Show a player's last ten games, newest first.
    History {
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// List stored sessions.
    Sessions {
        #[arg(long)]
        json: bool,
    },
    /// Delete sessions older than the session TTL without scoring them.
    Purge {
        /// Age in seconds (default: CHESSBOT_SESSION_TTL_SECS).
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
}

/// Logs go to stderr, or to a daily file when CHESSBOT_LOG_DIR is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var_os("CHESSBOT_LOG_DIR") {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "chessbot");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .with(filter)
                .init();
            None
        }
    }
}

/// Lowercased name doubles as the chat id at the console.
fn console_user(name: &str) -> ChatUser {
    ChatUser::human(name.trim().to_lowercase(), name.trim())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::info!("Using data directory: {}", config.data_dir.display());

    let db = Database::open(&config.database_path())
        .await
        .with_context(|| format!("opening {}", config.database_path().display()))?;
    let sessions = SqliteSessionRepository::new(db.pool().clone());
    let profiles = SqliteProfileRepository::new(db.pool().clone());

    match cli.command {
        Commands::Play {
            difficulty,
            color,
            name,
        } => {
            let player = console_user(&name);
            let request = GameRequest {
                channel_id: CONSOLE_CHANNEL.to_string(),
                challenger: player.clone(),
                opponent: None,
                difficulty: Some(difficulty),
                color,
            };
            let perspective = match color {
                ColorPreference::Black => Side::Black,
                _ => Side::White,
            };
            run_game(&config, sessions, profiles, perspective, request, vec![player]).await?;
        }
        Commands::Duel {
            white_name,
            black_name,
            color,
        } => {
            let challenger = console_user(&white_name);
            let opponent = console_user(&black_name);
            let request = GameRequest {
                channel_id: CONSOLE_CHANNEL.to_string(),
                challenger: challenger.clone(),
                opponent: Some(opponent.clone()),
                difficulty: None,
                color,
            };
            run_game(
                &config,
                sessions,
                profiles,
                Side::White,
                request,
                vec![challenger, opponent],
            )
            .await?;
        }
        Commands::Profile { user, json } => {
            let manager = offline_manager(&config, sessions, profiles);
            let user_id = user.trim().to_lowercase();
            match manager.profile(&user_id).await? {
                Some(view) if json => println!("{}", serde_json::to_string_pretty(&view)?),
                Some(view) => {
                    println!("{}", view.display_name);
                    println!("  Elo:      {}", view.elo);
                    println!(
                        "  Record:   {}W / {}L / {}D ({} games)",
                        view.wins, view.losses, view.draws, view.total
                    );
                    println!("  Win rate: {:.1}%", view.win_rate);
                }
                None => println!("No profile for {}", user),
            }
        }
        Commands::History { user, json } => {
            let manager = offline_manager(&config, sessions, profiles);
            let games = manager.recent_games(&user.trim().to_lowercase()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&games)?);
            } else if games.is_empty() {
                println!("No games played yet.");
            } else {
                for game in games {
                    println!(
                        "{:<5} vs {:<20} {:+}",
                        game.result.as_str(), game.opponent_name, game.elo_delta
                    );
                }
            }
        }
        Commands::Sessions { json } => {
            let stored = sessions.list_sessions().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stored)?);
            } else if stored.is_empty() {
                println!("No sessions.");
            } else {
                for s in stored {
                    println!(
                        "{}  {}  {} vs {}  {}",
                        s.channel_id,
                        s.game_type.as_str(),
                        s.white.name,
                        s.black.name,
                        s.fen
                    );
                }
            }
        }
        Commands::Purge { older_than_secs } => {
            let age = older_than_secs.unwrap_or(config.session.session_ttl.as_secs());
            let purged = sessions
                .purge_expired(now_timestamp().saturating_sub(age))
                .await?;
            println!("Purged {} session(s)", purged.len());
        }
    }

    Ok(())
}

fn offline_manager(
    config: &Config,
    sessions: SqliteSessionRepository,
    profiles: SqliteProfileRepository,
) -> SessionManager {
    SessionManager::new(
        config.session.clone(),
        sessions,
        profiles,
        Arc::new(ConsoleSurface::new(Side::White)),
        Arc::new(StockfishLauncher::new(config.engine.clone())),
    )
}

async fn run_game(
    config: &Config,
    sessions: SqliteSessionRepository,
    profiles: SqliteProfileRepository,
    perspective: Side,
    request: GameRequest,
    players: Vec<ChatUser>,
) -> anyhow::Result<()> {
    let manager = SessionManager::new(
        config.session.clone(),
        sessions,
        profiles,
        Arc::new(ConsoleSurface::new(perspective)),
        Arc::new(StockfishLauncher::new(config.engine.clone())),
    );
    let recovered = manager.recover_orphans().await?;
    if recovered > 0 {
        tracing::info!(recovered, "Finalized sessions left over from a previous run");
    }
    let sweeper = manager.spawn_sweeper();

    let starter = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.start_game(request).await })
    };
    let console = run_console(&manager, CONSOLE_CHANNEL, &players);
    tokio::pin!(console);

    let summary = tokio::select! {
        started = starter => match started? {
            Ok(_) => console.await?,
            Err(e) => {
                println!("{}", e);
                None
            }
        },
        summary = &mut console => summary?,
    };

    if let Some(summary) = summary {
        print_summary(&summary);
    }
    manager.shutdown_all().await;
    sweeper.abort();
    Ok(())
}

fn print_summary(summary: &GameSummary) {
    println!("Game over ({}).", summary.reason.as_str());
    if summary.white_delta != 0 || summary.black_delta != 0 {
        println!(
            "{} {:+}, {} {:+}",
            summary.white.name, summary.white_delta, summary.black.name, summary.black_delta
        );
    }
}

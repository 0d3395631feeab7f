use crate::uci::{parse_uci_message, UciMessage};
use crate::{Difficulty, EngineError, EngineEvent, EngineLauncher, OpponentEngine};
use async_trait::async_trait;
use chess::{convert_uci_castling_to_cozy, fen::parse_fen};
use cozy_chess::Move;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

/// Process and timing settings for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit executable. When set, no other location is tried.
    pub path: Option<PathBuf>,
    pub skill_level: u8,
    pub handshake_timeout: Duration,
    pub think_time: Duration,
    pub move_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            skill_level: Difficulty::Intermediate.skill_level(),
            handshake_timeout: Duration::from_secs(5),
            think_time: Duration::from_millis(1500),
            move_timeout: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

pub struct StockfishEngine {
    process: Child,
    stdin: mpsc::Sender<String>,
    event_rx: mpsc::Receiver<EngineEvent>,
    think_time: Duration,
    move_timeout: Duration,
    shutdown_grace: Duration,
    closed: bool,
}

impl StockfishEngine {
    /// Spawn a Stockfish process and complete the UCI handshake.
    #[tracing::instrument(level = "info", skip(config), fields(skill = config.skill_level))]
    pub async fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let path = find_stockfish_path(config.path.as_deref())
            .ok_or_else(|| EngineError::Unavailable("Stockfish not found".to_string()))?;
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Unavailable(format!("Failed to spawn Stockfish: {}", e))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("Failed to get stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unavailable("Failed to get stdout".to_string()))?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(32);
        tokio::spawn(read_engine_output(stdout, event_tx));

        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(write_engine_input(stdin, stdin_rx));

        let mut engine = Self {
            process,
            stdin: stdin_tx,
            event_rx,
            think_time: config.think_time,
            move_timeout: config.move_timeout,
            shutdown_grace: config.shutdown_grace,
            closed: false,
        };

        if let Err(e) = engine.handshake(&config).await {
            tracing::error!("Engine initialization failed: {}", e);
            engine.shutdown().await;
            return Err(EngineError::Unavailable(e.to_string()));
        }

        tracing::info!("Stockfish engine spawned and initialized successfully");
        Ok(engine)
    }

    async fn handshake(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.wait_ready(config.handshake_timeout).await?;

        tracing::info!("Setting skill level to {}", config.skill_level);
        self.send(&format!("setoption name Skill Level value {}", config.skill_level))
            .await?;
        self.send("isready").await?;
        self.wait_ready(config.handshake_timeout).await
    }

    async fn wait_ready(&mut self, limit: Duration) -> Result<(), EngineError> {
        let rx = &mut self.event_rx;
        let waited = tokio::time::timeout(limit, async {
            while let Some(event) = rx.recv().await {
                if matches!(event, EngineEvent::Ready) {
                    return Ok(());
                }
            }
            Err(EngineError::Crashed)
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(limit.as_millis() as u64)),
        }
    }

    async fn send(&self, line: &str) -> Result<(), EngineError> {
        self.stdin
            .send(format!("{}\n", line))
            .await
            .map_err(|_| EngineError::Crashed)
    }
}

#[async_trait]
impl OpponentEngine for StockfishEngine {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn request_move(&mut self, fen: &str) -> Result<Move, EngineError> {
        if self.closed {
            return Err(EngineError::Crashed);
        }
        let board = parse_fen(fen).map_err(|e| EngineError::InvalidPosition(e.to_string()))?;
        let mut legal = Vec::new();
        board.generate_moves(|mvs| {
            legal.extend(mvs);
            false
        });

        // A late answer to an earlier, abandoned search must not be taken as this one.
        while self.event_rx.try_recv().is_ok() {}

        self.send(&format!("position fen {}", fen)).await?;
        self.send(&format!("go movetime {}", self.think_time.as_millis()))
            .await?;

        let rx = &mut self.event_rx;
        let waited = tokio::time::timeout(self.move_timeout, async {
            while let Some(event) = rx.recv().await {
                match event {
                    EngineEvent::BestMove(mv) => return Ok(mv),
                    EngineEvent::NoMove => return Err(EngineError::NoMove),
                    EngineEvent::Info(info) => {
                        tracing::trace!(depth = ?info.depth, score = ?info.score, "search info");
                    }
                    EngineEvent::Ready => {}
                }
            }
            Err(EngineError::Crashed)
        })
        .await;

        match waited {
            Ok(Ok(mv)) => {
                let mv = convert_uci_castling_to_cozy(mv, &legal);
                tracing::info!("Engine chose {}", chess::format_uci_move(mv));
                Ok(mv)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!("Engine did not answer within {:?}", self.move_timeout);
                let _ = self.send("stop").await;
                Err(EngineError::Timeout(self.move_timeout.as_millis() as u64))
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        tracing::info!("Sending quit command to engine");
        let _ = self.send("quit").await;
        if tokio::time::timeout(self.shutdown_grace, self.process.wait())
            .await
            .is_err()
        {
            tracing::warn!("Engine ignored quit, killing process");
            let _ = self.process.kill().await;
        }
    }

    fn name(&self) -> &str {
        "Stockfish"
    }
}

async fn read_engine_output(
    stdout: tokio::process::ChildStdout,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::debug!("Stockfish stdout EOF - engine closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                tracing::trace!("UCI << {}", trimmed);

                let event = match parse_uci_message(trimmed) {
                    Ok(UciMessage::UciOk) | Ok(UciMessage::ReadyOk) => EngineEvent::Ready,
                    Ok(UciMessage::BestMove { mv, .. }) => EngineEvent::BestMove(mv),
                    Ok(UciMessage::NoBestMove) => EngineEvent::NoMove,
                    Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                    Ok(UciMessage::Id { name, value }) => {
                        tracing::debug!("Engine id {}: {}", name, value);
                        continue;
                    }
                    Err(_) => continue,
                };

                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Error reading from Stockfish stdout: {}", e);
                break;
            }
        }
    }
}

async fn write_engine_input(
    mut stdin: tokio::process::ChildStdin,
    mut stdin_rx: mpsc::Receiver<String>,
) {
    while let Some(cmd) = stdin_rx.recv().await {
        tracing::trace!("UCI >> {}", cmd.trim());
        if let Err(e) = stdin.write_all(cmd.as_bytes()).await {
            tracing::error!("Failed to write to stdin: {}", e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            tracing::error!("Failed to flush stdin: {}", e);
            break;
        }
    }
}

/// Find a Stockfish executable: the configured path if given, otherwise
/// common install locations and then `PATH`.
pub fn find_stockfish_path(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.is_file().then(|| path.to_path_buf());
    }

    let known = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];
    if let Some(found) = known.iter().map(Path::new).find(|p| p.is_file()) {
        return Some(found.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join("stockfish"))
        .find(|candidate| candidate.is_file())
}

/// Launches one Stockfish process per game at the requested strength.
#[derive(Debug, Clone, Default)]
pub struct StockfishLauncher {
    config: EngineConfig,
}

impl StockfishLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for StockfishLauncher {
    async fn launch(&self, difficulty: Difficulty) -> Result<Box<dyn OpponentEngine>, EngineError> {
        let config = EngineConfig {
            skill_level: difficulty.skill_level(),
            ..self.config.clone()
        };
        let engine = StockfishEngine::spawn(config).await?;
        Ok(Box::new(engine))
    }
}

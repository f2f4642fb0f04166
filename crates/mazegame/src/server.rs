//! `MazeGameServer` builder and accept loop.
//!
//! This is the entry point for running a maze game server. It ties the
//! layers together: TCP transport → connection handler → game pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use mazegame_engine::{GameHandle, spawn_game};
use mazegame_maze::{Maze, build_maze};
use mazegame_transport::{TcpTransport, Transport, TransportError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::MazeGameError;
use crate::bots::BotRegistry;
use crate::config::ServerConfig;
use crate::handler::{ConnectionOptions, handle_connection};

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use mazegame::prelude::*;
///
/// # async fn start() -> Result<(), MazeGameError> {
/// let server = MazeGameServer::builder()
///     .config(ServerConfig::default())
///     .bind("0.0.0.0:12345")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct MazeGameServerBuilder {
    config: ServerConfig,
    bind_addr: Option<String>,
    maze: Option<Maze>,
}

impl MazeGameServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            bind_addr: None,
            maze: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the configured bind address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Uses `maze` instead of building one from the configuration.
    pub fn maze(mut self, maze: Maze) -> Self {
        self.maze = Some(maze);
        self
    }

    /// Binds the listener, builds the maze and starts the game pipeline and
    /// the configured bots.
    pub async fn build(self) -> Result<MazeGameServer, MazeGameError> {
        let mut config = self.config.validated();
        if let Some(addr) = self.bind_addr {
            config.connection.bind_addr = addr;
        }
        let transport = TcpTransport::bind(&config.connection.bind_addr).await?;

        let maze = match self.maze {
            Some(maze) => maze,
            None => build_maze(&config.maze),
        };
        let bots = Arc::new(BotRegistry::new(config.bots.special.clone(), config.maze.seed));
        let game = spawn_game(maze, config.engine_config(), bots);

        for name in &config.bots.auto_launch {
            let launched = game.spawn_bot(name.as_str()).await?;
            // Naming the trapeater only enables it; the engine launches it
            // when traps pile up.
            if !launched && *name != config.bots.special.trapeater {
                warn!(name = %name, "could not launch bot");
            }
        }

        Ok(MazeGameServer {
            transport,
            game,
            options: ConnectionOptions {
                instant_flush: config.connection.instant_flush,
                server_side: false,
            },
        })
    }
}

impl Default for MazeGameServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting
/// connections.
pub struct MazeGameServer {
    transport: TcpTransport,
    game: GameHandle,
    options: ConnectionOptions,
}

impl MazeGameServer {
    pub fn builder() -> MazeGameServerBuilder {
        MazeGameServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The game this server feeds. Operators use it for administration.
    pub fn game(&self) -> GameHandle {
        self.game.clone()
    }

    /// Runs the accept loop until the game pipeline stops.
    ///
    /// Then the listener is released and every connection handler is
    /// awaited, so that the final `QUIT` lines reach their clients.
    pub async fn run(mut self) -> Result<(), MazeGameError> {
        info!(addr = ?self.transport.local_addr().ok(), "maze game server running");
        let mut handlers = JoinSet::new();

        loop {
            let accepted = tokio::select! {
                accepted = self.transport.accept() => accepted,
                () = self.game.closed() => break,
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "connection handler failed");
                    }
                    continue;
                }
            };
            let conn = match accepted {
                Ok(conn) => conn,
                Err(TransportError::Shutdown) => break,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    continue;
                }
            };
            let game = self.game.clone();
            let options = self.options;
            handlers.spawn(async move {
                if let Err(e) = handle_connection(conn, game, options).await {
                    debug!(error = %e, "connection ended with error");
                }
            });
        }

        self.transport.shutdown().await?;
        info!(connections = handlers.len(), "game stopped, waiting for connections to close");
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "connection handler failed");
            }
        }
        info!("maze game server stopped");
        Ok(())
    }
}

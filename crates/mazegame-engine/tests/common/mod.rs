//! Test harness: a game over a small fixed maze and clients that are plain
//! channels instead of sockets.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mazegame_engine::{EngineConfig, GameHandle, NoBots, spawn_game};
use mazegame_maze::Maze;
use mazegame_protocol::{Message, PlayerId};
use mazegame_transport::ConnectionId;
use tokio::sync::mpsc;

/// A ring corridor. No dead ends, 14 walkable cells.
pub const RING: [&str; 5] = [
    "#######",
    "#.....#",
    "#.###.#",
    "#.....#",
    "#######",
];

pub fn config() -> EngineConfig {
    EngineConfig {
        seed: Some(7),
        ..EngineConfig::default()
    }
}

pub fn start(config: EngineConfig) -> GameHandle {
    spawn_game(Maze::from_lines(&RING), config, Arc::new(NoBots))
}

pub struct TestClient {
    pub conn_id: ConnectionId,
    pub id: PlayerId,
    pub direction: String,
    pub position: (i32, i32),
    rx: mpsc::UnboundedReceiver<Message>,
}

impl TestClient {
    /// Connects without logging in.
    pub async fn connect(game: &GameHandle) -> (bool, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = ConnectionId::next();
        let accepted = game.connect(conn_id, tx, false).await.unwrap();
        let client = Self {
            conn_id,
            id: PlayerId(0),
            direction: String::new(),
            position: (-1, -1),
            rx,
        };
        (accepted, client)
    }

    /// Connects and logs in.
    pub async fn login(game: &GameHandle, nick: &str) -> Self {
        let (accepted, mut client) = Self::connect(game).await;
        assert!(accepted);
        assert_eq!(client.next().await.as_deref(), Some("MSRV;1"));
        client.send(game, &format!("HELO;{nick}"));
        let welcome = client.expect("WELC;").await;
        client.id = PlayerId(welcome[5..].parse().unwrap());
        client
    }

    /// Logs in, queries the maze and waits for the first `RDY.`.
    pub async fn enter(game: &GameHandle, nick: &str) -> Self {
        let mut client = Self::login(game, nick).await;
        client.send(game, "MAZ?");
        let own = format!("PPOS;{};", client.id.0);
        let lines = client.collect_until("RDY.").await;
        let appear = lines
            .iter()
            .find(|l| l.starts_with(&own) && l.ends_with(";app"))
            .expect("own position in maze query");
        client.direction = field(appear, 4).to_string();
        client.position = (
            field(appear, 2).parse().unwrap(),
            field(appear, 3).parse().unwrap(),
        );
        client
    }

    pub fn send(&self, game: &GameHandle, line: &str) {
        game.submit_line(self.conn_id, line.to_string()).unwrap();
    }

    /// Next non-empty line, `None` once the queue is closed.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(600), self.rx.recv())
                .await
                .expect("timed out waiting for a line")?;
            if !message.is_empty() {
                return Some(message.text);
            }
        }
    }

    /// Skips lines until one starts with `prefix`.
    pub async fn expect(&mut self, prefix: &str) -> String {
        loop {
            match self.next().await {
                Some(line) if line.starts_with(prefix) => return line,
                Some(_) => {}
                None => panic!("queue closed while waiting for {prefix:?}"),
            }
        }
    }

    /// Every line up to and including the first that starts with `prefix`.
    pub async fn collect_until(&mut self, prefix: &str) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.next().await {
                Some(line) => {
                    let done = line.starts_with(prefix);
                    lines.push(line);
                    if done {
                        return lines;
                    }
                }
                None => panic!("queue closed while waiting for {prefix:?}, got {lines:?}"),
            }
        }
    }

    /// Lines already queued, without waiting.
    pub fn pending(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if !message.is_empty() {
                lines.push(message.text);
            }
        }
        lines
    }

    /// Turns right until facing `direction` (`n`, `e`, `s`, `w`). Leaves
    /// the client ready.
    pub async fn face(&mut self, game: &GameHandle, direction: &str) {
        let own = format!("PPOS;{};", self.id.0);
        while self.direction != direction {
            self.send(game, "TURN;r");
            let lines = self.collect_until("RDY.").await;
            let turned = lines
                .iter()
                .find(|l| l.starts_with(&own) && l.ends_with(";trn"))
                .expect("turn broadcast");
            self.direction = field(turned, 4).to_string();
        }
    }

    /// Moves the player with an operator teleport. The target must not be
    /// held by another player or a bait.
    pub async fn place(&mut self, game: &GameHandle, x: i32, y: i32) {
        if self.position == (x, y) {
            return;
        }
        let result = game.teleport(self.id, x, y).await.unwrap();
        assert_eq!(result, mazegame_engine::OccupationResult::Success);
        self.position = (x, y);
    }
}

pub fn field(line: &str, index: usize) -> &str {
    line.split(';').nth(index).unwrap_or_default()
}

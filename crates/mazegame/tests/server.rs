//! Integration tests for the server over real TCP sockets, bots included.

use std::time::Duration;

use mazegame::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

const RING: [&str; 5] = [
    "#######",
    "#.....#",
    "#.###.#",
    "#.....#",
    "#######",
];

const WAIT: Duration = Duration::from_secs(10);

// =========================================================================
// Helpers
// =========================================================================

async fn start(config: ServerConfig) -> (String, GameHandle) {
    let (addr, game, _running) = launch(config).await;
    (addr, game)
}

async fn launch(
    mut config: ServerConfig,
) -> (String, GameHandle, JoinHandle<Result<(), MazeGameError>>) {
    config.maze.seed = Some(11);
    let server = MazeGameServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .maze(Maze::from_lines(&RING))
        .build()
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let game = server.game();
    (addr, game, tokio::spawn(server.run()))
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn login(addr: &str, nick: &str) -> Self {
        let mut client = Self::connect(addr).await;
        assert_eq!(client.next().await.as_deref(), Some("MSRV;1"));
        client.send(&format!("HELO;{nick}")).await;
        client.expect("WELC;").await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    async fn next(&mut self) -> Option<String> {
        tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    async fn expect(&mut self, prefix: &str) -> String {
        loop {
            match self.next().await {
                Some(line) if line.starts_with(prefix) => return line,
                Some(_) => {}
                None => panic!("connection closed while waiting for {prefix:?}"),
            }
        }
    }
}

async fn wait_for_player(game: &GameHandle, nick: &str) -> PlayerInfo {
    tokio::time::timeout(WAIT, async {
        loop {
            let infos = game.player_infos().await.unwrap();
            if let Some(info) = infos.into_iter().find(|p| p.nick == nick) {
                return info;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("player never showed up")
}

// =========================================================================
// Protocol over TCP
// =========================================================================

#[tokio::test]
async fn test_server_login_and_maze_transfer() {
    let (addr, _game) = start(ServerConfig::default()).await;
    let mut alice = Client::login(&addr, "alice").await;

    alice.send("MAZ?").await;
    assert_eq!(alice.next().await.as_deref(), Some("MAZE;7;5"));
    for row in RING {
        assert_eq!(alice.next().await.as_deref(), Some(row));
    }
    alice.expect("RDY.").await;
}

#[tokio::test]
async fn test_server_bye_closes_socket() {
    let (addr, game) = start(ServerConfig::default()).await;
    let mut alice = Client::login(&addr, "alice").await;

    alice.send("BYE!").await;
    alice.expect("QUIT").await;
    assert_eq!(alice.next().await, None);
    assert_eq!(game.server_info().await.unwrap().connected_clients, 0);
}

#[tokio::test]
async fn test_server_dropped_socket_leaves_game() {
    let (addr, game) = start(ServerConfig::default()).await;
    let alice = Client::login(&addr, "alice").await;
    let mut bob = Client::login(&addr, "bob").await;
    bob.send("MAZ?").await;
    bob.expect("RDY.").await;

    drop(alice);
    tokio::time::timeout(WAIT, async {
        while game.server_info().await.unwrap().connected_clients > 1 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_server_full_rejects_connection() {
    let mut config = ServerConfig::default();
    config.connection.max_clients = 1;
    let (addr, _game) = start(config).await;
    let _alice = Client::login(&addr, "alice").await;

    let mut late = Client::connect(&addr).await;
    assert_eq!(late.next().await.as_deref(), Some("INFO;451"));
    assert_eq!(late.next().await, None);
}

#[tokio::test]
async fn test_server_shutdown_quits_clients() {
    let (addr, game) = start(ServerConfig::default()).await;
    let mut alice = Client::login(&addr, "alice").await;

    game.shutdown().await.unwrap();
    alice.expect("QUIT").await;
    assert_eq!(alice.next().await, None);
}

#[tokio::test]
async fn test_server_run_returns_after_shutdown_without_new_clients() {
    let (addr, game, running) = launch(ServerConfig::default()).await;
    let mut alice = Client::login(&addr, "alice").await;

    game.shutdown().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(3), running)
        .await
        .expect("accept loop still running after shutdown")
        .unwrap();
    assert!(result.is_ok());

    // Handlers were awaited, so the goodbye is already on the wire.
    alice.expect("QUIT").await;
    assert_eq!(alice.next().await, None);
    // The listener is released.
    assert!(TcpStream::connect(&addr).await.is_err());
}

// =========================================================================
// Bots
// =========================================================================

#[tokio::test]
async fn test_server_auto_launched_dummy_moves() {
    let mut config = ServerConfig::default();
    config.bots.auto_launch = vec![String::from("dummy")];
    let (addr, game) = start(config).await;

    let dummy = wait_for_player(&game, "dummy1").await;
    assert!(dummy.server_side);

    let mut alice = Client::login(&addr, "alice").await;
    alice.send("MAZ?").await;
    let own = format!("PPOS;{};", dummy.id.0);
    loop {
        let line = alice.expect(&own).await;
        if line.ends_with(";mov") || line.ends_with(";trn") {
            break;
        }
    }
}

#[tokio::test]
async fn test_server_spawn_frenzy_through_handle() {
    let (_addr, game) = start(ServerConfig::default()).await;

    assert!(game.spawn_bot("frenzy").await.unwrap());
    let frenzy = wait_for_player(&game, "frenzy").await;
    assert!(frenzy.server_side);
    // A running frenzy is reported as launched without a second instance.
    assert!(game.spawn_bot("frenzy").await.unwrap());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let infos = game.player_infos().await.unwrap();
    assert_eq!(infos.iter().filter(|p| p.nick == "frenzy").count(), 1);

    assert!(game.kill(frenzy.id).await.unwrap());
    assert!(game.spawn_bot("frenzy").await.unwrap());
}

#[tokio::test]
async fn test_server_unknown_bot_not_launched() {
    let (_addr, game) = start(ServerConfig::default()).await;
    assert!(!game.spawn_bot("robot").await.unwrap());
    let info = game.server_info().await.unwrap();
    assert_eq!(info.available_bots, vec!["dummy", "trapeater", "frenzy"]);
    assert!(info.auto_trapeater);
}

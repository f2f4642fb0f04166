//! `mazegame-server`: runs one maze game server until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use mazegame::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file. A missing file means defaults.
    #[arg(short, long, default_value = "mazegame.json")]
    config: PathBuf,

    /// Listen address, overriding the configuration (e.g. "0.0.0.0:12345").
    #[arg(short, long)]
    bind: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), MazeGameError> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::load(Some(&args.config))?;
    let mut builder = MazeGameServer::builder().config(config);
    if let Some(addr) = args.bind.as_deref() {
        builder = builder.bind(addr);
    }
    let server = builder.build().await?;
    let game = server.game();
    info!(addr = ?server.local_addr().ok(), "listening");

    let run = server.run();
    tokio::pin!(run);
    tokio::select! {
        result = &mut run => return result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            game.shutdown().await?;
        }
    }
    // Lets the handlers flush their last lines before the runtime goes.
    run.await
}

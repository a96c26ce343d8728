//! ReelFire
//!
//! Usage:
//!   reelfire serve [--http ADDR] [--tcp ADDR] [--mock]   - run the game server
//!   reelfire watch [--tcp ADDR | --ws URL] [--fps N]     - terminal reel viewer
//!   reelfire config                                      - print the effective config

mod serve;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rf_core::GameConfig;

#[derive(Parser)]
#[command(name = "reelfire", about = "Live jackpot reel game", version)]
struct Cli {
    /// Config file (defaults to $REELFIRE_CONFIG, then ./reelfire.config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine with its HTTP and TCP adapters
    Serve {
        /// HTTP listen address
        #[arg(long)]
        http: Option<String>,
        /// TCP push listen address
        #[arg(long)]
        tcp: Option<String>,
        /// Feed random buys and sells
        #[arg(long)]
        mock: bool,
    },
    /// Connect to a server and animate the reels in the terminal
    Watch {
        /// TCP push address (host:port)
        #[arg(long, conflicts_with = "ws")]
        tcp: Option<String>,
        /// WebSocket URL (ws://host:port/api/ws)
        #[arg(long)]
        ws: Option<String>,
        /// Animation ticks per second
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Print the effective configuration as JSON
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    match path {
        Some(p) => GameConfig::load_from_path(p).with_context(|| format!("loading {}", p.display())),
        None => GameConfig::load().context("loading configuration"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { http, tcp, mock } => {
            if let Some(addr) = http {
                config.http_addr = addr;
            }
            if let Some(addr) = tcp {
                config.tcp_addr = addr;
            }
            config.mock |= mock;
            serve::run(config).await
        }
        Commands::Watch { tcp, ws, fps } => {
            let target = match ws {
                Some(url) => watch::Target::WebSocket(url),
                None => watch::Target::Tcp(tcp.unwrap_or_else(|| config.tcp_addr.clone())),
            };
            watch::run(config, target, fps).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

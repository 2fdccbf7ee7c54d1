//! taskvault binary: HTTP server and interactive console client.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use taskvault::{client, config::Config, gateway};

/// CLI arguments.
///
/// Configuration priority (highest to lowest): command-line flags,
/// configuration file, built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "taskvault")]
#[command(about = "Task-management API with HTTP Basic Authentication")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ~/.taskvault/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Bind host (overrides config file)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive console client
    Client {
        /// Base URL of a running server
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("taskvault=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(gateway::run_gateway(config))
        }
        // The client is prompt-driven and blocking; no runtime needed.
        Command::Client { url } => client::run_client(&url),
    }
}

//! CLI for Linecast
//!
//! Subcommands:
//! - `serve`: run the relay
//! - `send`: publish lines read from stdin
//! - `receive`: print every relayed line to stdout

use clap::Parser;
use linecast::config::load_config;
use linecast::peer::{run_receiver, run_sender};
use linecast::transport::start_relay_server;
use linecast::utils::{RelayError, logging};
use tokio::io::BufReader;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "linecast", about = "Newline-delimited text relay")]
enum Command {
    /// Start the relay server
    Serve {
        /// Address to bind (overrides configuration)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
        /// Log level (overrides configuration)
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Publish stdin lines to a relay
    Send {
        #[arg(long, default_value = "127.0.0.1:12345")]
        addr: String,
    },
    /// Print lines relayed to this subscriber
    Receive {
        #[arg(long, default_value = "127.0.0.1:12345")]
        addr: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    let result = match cmd {
        Command::Serve {
            host,
            port,
            log_level,
        } => run_server(host, port, log_level).await,
        Command::Send { addr } => {
            logging::init("info");
            let stdin = BufReader::new(tokio::io::stdin());
            run_sender(&addr, stdin)
                .await
                .map(|sent| info!("Sent {} lines", sent))
        }
        Command::Receive { addr } => {
            logging::init("info");
            run_receiver(&addr, tokio::io::stdout())
                .await
                .map(|received| info!("Received {} lines", received))
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(
    host: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
) -> Result<(), RelayError> {
    let mut config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            return Err(e.into());
        }
    };
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(level) = log_level {
        config.log.level = level;
    }
    logging::init(&config.log.level);

    let addr = config.server.address();

    tokio::select! {
        result = start_relay_server(addr, config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}

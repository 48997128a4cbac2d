//! zwgate Daemon - Main entry point
//!
//! Connects to the Z-Wave driver, keeps the device registry current and
//! serves it over HTTP, console sessions and event streams.

mod api;
mod config;
mod console;
mod driver;
mod fanout;
mod server;
mod state;
mod stream;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "zwgate")]
#[command(about = "Z-Wave controller bridge with REST API, console and event stream")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "zwgate.toml")]
    config: PathBuf,

    /// Bind address for the HTTP API
    #[arg(long)]
    http: Option<String>,

    /// Bind address for console sessions
    #[arg(long)]
    console: Option<String>,

    /// Bind address for the event stream
    #[arg(long)]
    events: Option<String>,

    /// Address of the Z-Wave driver socket
    #[arg(short, long)]
    driver: Option<String>,

    /// Run a console on this terminal instead of starting listeners
    #[arg(short, long)]
    interactive: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Where log output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogSink {
    Stdout,
    /// The interactive console owns stdout and already mirrors log lines
    Stderr,
}

impl LogSink {
    fn for_mode(interactive: bool) -> Self {
        if interactive {
            Self::Stderr
        } else {
            Self::Stdout
        }
    }
}

fn log_writer(interactive: bool) -> BoxMakeWriter {
    match LogSink::for_mode(interactive) {
        LogSink::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogSink::Stderr => BoxMakeWriter::new(std::io::stderr),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(log_writer(args.interactive))
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("zwgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Command-line overrides
    if let Some(http) = args.http {
        config.daemon.bind = http;
    }
    if let Some(console) = args.console {
        config.console.bind = Some(console);
    }
    if let Some(events) = args.events {
        config.events.bind = Some(events);
    }
    if let Some(driver) = args.driver {
        config.driver.address = driver;
    }

    info!(
        http = %config.daemon.bind,
        driver = %config.driver.address,
        "Configuration loaded"
    );

    let (controller, events) = driver::connect(&config.driver).await?;
    let state = state::AppState::new(config, Arc::new(controller));
    let ingest = state.spawn_ingest(events);

    let interactive = args.interactive;
    let service = {
        let state = state.clone();
        async move {
            if interactive {
                info!("Interactive mode enabled");
                console::run_session(state, tokio::io::stdin(), tokio::io::stdout()).await
            } else {
                server::run(state).await
            }
        }
    };

    tokio::select! {
        result = service => result?,
        result = ingest => result??,
        _ = tokio::signal::ctrl_c() => {
            state.fanout.broadcast_log("Shutting down...");
        }
    }

    Ok(())
}

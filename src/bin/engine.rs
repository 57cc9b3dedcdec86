use bayeux_engine::console::{Console, SharedOutput};
use bayeux_engine::{Config, ConnectionRegistry, Engine};
use clap::Parser;
use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Client liveness timeout in seconds (clients never expire if unset)
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if args.timeout.is_some() {
        config.timeout = args.timeout;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    // Initialize tracing
    let log_level = if args.verbose {
        "debug"
    } else {
        &config.log_level
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(format!("bayeux_engine={}", log_level))
        .init();

    info!("Starting Bayeux engine console v{}", env!("CARGO_PKG_VERSION"));
    match config.timeout {
        Some(timeout) => info!("Client liveness timeout: {}s", timeout),
        None => warn!("No timeout configured, clients never expire"),
    }

    let connections = Arc::new(ConnectionRegistry::new());
    let engine = Engine::new(config, connections.clone())?;
    let out: SharedOutput = Arc::new(Mutex::new(Box::new(io::stdout())));
    let console = Console::new(engine, connections, Arc::clone(&out));

    for line in io::stdin().lock().lines() {
        let line = line?;
        let Some(reply) = console.handle_line(&line) else {
            break;
        };
        if reply.is_empty() {
            continue;
        }
        let mut out = out.lock();
        writeln!(out, "{}", reply)?;
        out.flush()?;
    }

    info!(
        "Console closed with {} registered clients",
        console.engine().client_count()
    );
    Ok(())
}

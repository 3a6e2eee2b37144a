//! pebble: drive the tree engine from a shell.
//!
//! The store is in-memory, seeded from a JSON snapshot and optionally
//! written back after the command ran.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pebble_cli::{Command, Config, Overrides, Session, load_store, save_store};

#[derive(Parser, Debug)]
#[command(name = "pebble")]
#[command(about = "Browse and edit a remote document tree")]
struct Args {
    /// Store snapshot (JSON) to start from
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Server url (overrides PEBBLE_SERVER)
    #[arg(long)]
    server: Option<String>,

    /// Username (overrides PEBBLE_USERNAME)
    #[arg(short, long)]
    username: Option<String>,

    /// Password (overrides PEBBLE_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Connection display name (overrides PEBBLE_CONNECTION_NAME)
    #[arg(long)]
    name: Option<String>,

    /// Write the store back to the fixture afterwards
    #[arg(long)]
    write_back: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Respects RUST_LOG, defaults to warn (or debug with --verbose)
    let default_filter = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.write_back && args.fixture.is_none() {
        bail!("--write-back needs --fixture");
    }

    let config = Config::load(Overrides {
        server: args.server,
        username: args.username,
        password: args.password,
        name: args.name,
    })?;
    info!("Connecting to {} as {:?}", config.server, config.username);

    let store = load_store(args.fixture.as_deref()).await?;
    let mut session = Session::open(store, &config).await?;
    let output = session.run(args.command).await?;
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }

    if let Some(path) = args.fixture.filter(|_| args.write_back) {
        save_store(session.browser().store(), &path).await?;
    }
    Ok(())
}

//! Menuda main entry point

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use menuda_api::{start_server, AppState};
use menuda_config::Config;
use menuda_core::{FileSessionStore, HttpBackend, Session};

#[derive(Parser, Debug)]
#[command(name = "menuda")]
#[command(author = "Menuda Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Web front-end for the Menuda personal finance API", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print a default configuration file and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the configured level
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env).format_timestamp_millis().init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging.level);
    log::info!("Config loaded: backend={}, session={}", config.api_base(), config.session.path.display());

    let store = FileSessionStore::open(&config.session.path)
        .with_context(|| format!("Failed to open session file {}", config.session.path.display()))?;
    let session = Session::new(Arc::new(store));
    match session.profile() {
        Ok(Some(profile)) => log::info!("Resuming session for {}", profile.email),
        Ok(None) => log::info!("No stored profile, sign-in required"),
        Err(e) => log::warn!("Stored profile unreadable: {}", e),
    }

    let backend = HttpBackend::from_config(&config).context("Failed to build backend client")?;
    let state = AppState::new(config, Arc::new(backend), session);

    start_server(state).await.context("Server error")?;
    Ok(())
}

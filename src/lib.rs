pub mod ai;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod services;
pub mod session;

use cli::Args;
use config::AppConfig;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    // Default: warn for most crates, info for ours
    // Use RUST_LOG=debug for per-photo logs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,photo_sorter_lib=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<(), String> {
    AppConfig::load_dotenv();
    init_tracing();

    let args = Args::parse_args();
    args.validate()?;

    if args.forget_key {
        commands::photos::forget_key()?;
        if args.paths.is_empty() {
            return Ok(());
        }
    }

    if let Some(api_key) = &args.store_key {
        commands::photos::store_key(api_key.trim())?;
        if args.paths.is_empty() {
            return Ok(());
        }
    }

    commands::photos::organize_paths(&args).await
}

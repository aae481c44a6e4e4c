// crates/server/src/main.rs
//! turnlog CLI entrypoint (§10.4): a `serve` subcommand that starts the
//! HTTP facade and a `reindex` subcommand that runs the indexer once and
//! prints summary counts, useful for scripting without the HTTP layer.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use turnlog_db::Database;
use turnlog_server::{create_app, AppState, Config};

const DEFAULT_PORT: u16 = 4878;

#[derive(Parser)]
#[command(name = "turnlog", version, about = "Local indexer and search service over JSONL conversation logs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP facade (default when no subcommand is given).
    Serve {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Run the indexer once and print summary counts.
    Reindex {
        /// Drop and rebuild the schema before reindexing.
        #[arg(long)]
        reset: bool,
    },
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("tracing subscriber installs exactly once");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let db_path = config.db_path().context("resolving database path")?;
    let db = Database::new(&db_path).await.context("opening database")?;

    match cli.command.unwrap_or(Command::Serve { port: DEFAULT_PORT }) {
        Command::Serve { port } => serve(db, config, port).await,
        Command::Reindex { reset } => run_reindex(&db, &config, reset).await,
    }
}

async fn serve(db: Database, config: Config, port: u16) -> Result<()> {
    tracing::info!(sessions_root = %config.sessions_root.display(), "starting turnlog");

    let state = Arc::new(AppState { db, sessions_root: config.sessions_root });
    let app = create_app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding listener")?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await
        .context("serving")
}

async fn run_reindex(db: &Database, config: &Config, reset: bool) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} files")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    let on_progress = |done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };

    let summary = if reset {
        turnlog_db::indexer::reset_and_reindex(db, &config.sessions_root, on_progress).await
    } else {
        turnlog_db::indexer::reindex(db, &config.sessions_root, on_progress).await
    }
    .context("reindexing")?;
    pb.finish_and_clear();

    println!(
        "scanned {}, updated {}, removed {}, skipped {}, metadata-checked {}, messages {}",
        summary.scanned, summary.updated, summary.removed, summary.skipped, summary.metadata_checked, summary.message_count
    );
    Ok(())
}

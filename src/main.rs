use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perf_manager::config::Config;
use perf_manager::db::Database;
use perf_manager::models::SeedEmployee;
use perf_manager::session::SessionStore;
use perf_manager::web;

#[derive(Parser)]
#[command(name = "perfmgr")]
#[command(about = "Goals, tasks and feedback for managers and their teams")]
struct Cli {
    /// SQLite database file (overrides PERF_MANAGER_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Address to listen on (overrides PERF_MANAGER_BIND)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Apply pending schema migrations and exit
    Migrate,
    /// Load employees from a JSON file of `{"name", "manager"}` entries
    Seed {
        file: PathBuf,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "perf_manager=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    let db = Database::open(config.database_path.clone(), config.pool_size)?;
    db.migrate()?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            let addr = bind.unwrap_or(config.bind);
            let sessions = SessionStore::with_ttl(config.session_ttl);
            let app = web::router(web::AppState::with_sessions(db, sessions)?);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!("Performance manager listening on http://{}", addr);

            axum::serve(listener, app).await?;
        }
        Commands::Migrate => {
            tracing::info!(
                path = %config.database_path.display(),
                "Database is up to date"
            );
        }
        Commands::Seed { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let entries: Vec<SeedEmployee> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a list of employees", file.display()))?;

            let added = db.seed_employees(&entries)?;
            println!("Added {} employees", added.len());
        }
    }

    Ok(())
}

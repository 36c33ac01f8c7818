use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use taskdesk::auth::SessionKeys;
use taskdesk::cli::{AdminCommands, CreateUserArgs, run_create_user, run_list_users};
use taskdesk::config::{DEFAULT_PORT, DEFAULT_SESSION_TTL_HOURS, ServerConfig};
use taskdesk::server::{AppState, create_router};
use taskdesk::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(about = "A team task board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to bind to
        #[arg(long, short, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// SQLite database path or sqlite:// URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Secret mixed into session ids. A random one is generated when unset.
        #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
        session_secret: Option<String>,

        /// Session lifetime in hours
        #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = DEFAULT_SESSION_TTL_HOURS)]
        session_ttl_hours: i64,

        /// Only send the session cookie over HTTPS
        #[arg(long, env = "SECURE_COOKIES")]
        secure_cookies: bool,
    },
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    if config.session_ttl_hours <= 0 {
        anyhow::bail!("SESSION_TTL_HOURS must be positive");
    }

    let db_path = config.db_path()?;
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let expired = store.delete_expired_sessions(Utc::now())?;
    if expired > 0 {
        info!("Removed {expired} expired sessions");
    }

    let secret = match config.session_secret.clone() {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("SESSION_SECRET is not set; sessions will not survive a restart");
            SessionKeys::generate_secret()
        }
    };
    let sessions = SessionKeys::new(secret, Duration::hours(config.session_ttl_hours))
        .with_secure_cookies(config.secure_cookies);

    let state = Arc::new(AppState::new(Arc::new(store), sessions)?);
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Using database {}", db_path.display());
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("taskdesk=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::CreateUser {
                database_url,
                username,
                role,
                password,
                manager,
                non_interactive,
            } => run_create_user(CreateUserArgs {
                database_url,
                username,
                role,
                password,
                manager,
                non_interactive,
            })?,
            AdminCommands::ListUsers { database_url, json } => {
                run_list_users(database_url, json)?;
            }
        },
        Commands::Serve {
            host,
            port,
            database_url,
            session_secret,
            session_ttl_hours,
            secure_cookies,
        } => {
            serve(ServerConfig {
                host,
                port,
                database_url,
                session_secret,
                session_ttl_hours,
                secure_cookies,
            })
            .await?;
        }
    }

    Ok(())
}

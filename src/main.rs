use std::path::PathBuf;

use clap::{Parser, Subcommand};
use san::{
    auth::create_user,
    config::{AppConfig, create_app, run_migrations},
    state::make_pool,
    validation::{is_valid_email, is_valid_username},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML file with `database_url`, `bind` and `secret_key`.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server.
    Serve {
        /// Address to listen on, overriding the configuration.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create an administrator account.
    CreateStaff {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SAN_STAFF_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            if bind.is_some() {
                config.bind = bind;
            }
            let pool = make_pool(config.database_url())?;
            run_migrations(&pool)?;

            let app = create_app(pool, config.key()?);
            let listener = tokio::net::TcpListener::bind(config.bind()).await?;
            tracing::info!(
                addr = %listener.local_addr()?,
                database = config.database_url(),
                "listening"
            );
            axum::serve(listener, app).await?;
        }
        Command::CreateStaff {
            username,
            email,
            password,
        } => {
            is_valid_username(&username)?;
            is_valid_email(&email)?;
            if password.len() < 6 {
                return Err("password must be at least 6 characters".into());
            }

            let pool = make_pool(config.persistent_database_url()?)?;
            run_migrations(&pool)?;
            let mut conn = pool.get()?;
            let id = create_user(&username, &email, &password, true, &mut conn)?;
            tracing::info!(%id, %username, "created staff account");
        }
    }

    Ok(())
}

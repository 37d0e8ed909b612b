//! giftlist CLI
//!
//! Wish-list client: account sessions, gifts and link previews.

use anyhow::Result;
use clap::{Parser, Subcommand};
use giftlist::account::{run_login, run_logout, run_refresh, run_register, LoginArgs, RegisterArgs};
use giftlist::config::ConfigArgs;
use giftlist::gifts::{run_gifts, GiftsArgs};
use giftlist::preview::{run_preview, PreviewArgs};
use giftlist::serve::{run_serve, ServeArgs};
use giftlist::{FileStore, LogNavigator, TokenManager};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "giftlist")]
#[command(version)]
#[command(about = "Gift wish-list client with link previews")]
#[command(long_about = "Manage a gift wish-list from the terminal.\n\nCommands:\n  preview    Extract title, description and image from a URL\n  serve      Run the link-preview HTTP endpoint\n  login      Sign in and store the session\n  gifts      List, add, update and remove gifts")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a link preview (title, description, image) from a URL
    Preview(PreviewArgs),
    /// Serve GET /api/preview?url=... over HTTP
    Serve(ServeArgs),
    /// Sign in and store the access/refresh tokens
    Login(LoginArgs),
    /// Create an account
    Register(RegisterArgs),
    /// Sign out and forget stored tokens
    Logout,
    /// Exchange the stored refresh token for a new pair
    Refresh,
    /// Manage gifts
    Gifts(GiftsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preview(args) => run_preview(args, &cli.config.preview_config()).await,
        Commands::Serve(args) => run_serve(args, &cli.config.preview_config()).await,
        Commands::Login(args) => run_login(args, token_manager(&cli.config)?).await,
        Commands::Register(args) => run_register(args, token_manager(&cli.config)?).await,
        Commands::Logout => run_logout(token_manager(&cli.config)?).await,
        Commands::Refresh => run_refresh(token_manager(&cli.config)?).await,
        Commands::Gifts(args) => {
            run_gifts(args, token_manager(&cli.config)?, &cli.config.preview_config()).await
        }
    }
}

fn token_manager(config: &ConfigArgs) -> Result<TokenManager> {
    let store = Arc::new(FileStore::new(&config.credentials));
    Ok(TokenManager::new(
        config.client_config(),
        store,
        Arc::new(LogNavigator),
    )?)
}

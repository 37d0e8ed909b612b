//! login / register / logout / refresh commands

use crate::auth::TokenManager;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long, env = "GIFTLIST_EMAIL")]
    pub email: String,

    #[arg(long, env = "GIFTLIST_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Display name shown on the public list
    #[arg(long)]
    pub name: String,

    #[arg(long, env = "GIFTLIST_EMAIL")]
    pub email: String,

    #[arg(long, env = "GIFTLIST_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run_login(args: LoginArgs, tokens: TokenManager) -> Result<()> {
    let user = tokens
        .sign_in(&args.email, &args.password)
        .await
        .context("Login failed")?;

    println!("{}", json!({ "status": "signed_in", "user": user }));
    Ok(())
}

pub async fn run_register(args: RegisterArgs, tokens: TokenManager) -> Result<()> {
    let user = tokens
        .sign_up(&args.name, &args.email, &args.password)
        .await
        .context("Registration failed")?;

    let signed_in = tokens.access_token()?.is_some();
    println!(
        "{}",
        json!({ "status": "registered", "signed_in": signed_in, "user": user })
    );
    if !signed_in {
        eprintln!("Account created. Run `giftlist login` to sign in.");
    }
    Ok(())
}

pub async fn run_logout(tokens: TokenManager) -> Result<()> {
    tokens.sign_out().await.context("Logout failed")?;
    println!("{}", json!({ "status": "signed_out" }));
    Ok(())
}

/// Force a token refresh; mostly useful to check a stored session
pub async fn run_refresh(tokens: TokenManager) -> Result<()> {
    tokens
        .refresh_access_token()
        .await
        .context("Token refresh failed")?;

    let user = tokens.user()?;
    println!("{}", json!({ "status": "refreshed", "user": user }));
    Ok(())
}

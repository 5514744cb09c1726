// This is the entry point of the lol-page admin CLI.
//
// **Architecture Overview:**
// - `core/` = Business logic (moderation, accounts, forum, schools)
// - `infra/` = Implementations of core traits (SQLite stores)
// - `cli/` = Command-line adapter over the core services
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Dispatch the requested command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::cli::{App, Cli};
use crate::config::AppConfig;
use crate::core::accounts::{AccountConfig, AccountService};
use crate::core::forum::ForumService;
use crate::core::moderation::ContentModerator;
use crate::infra::accounts::SqliteAccountStore;
use crate::infra::database;
use crate::infra::forum::SqliteForumStore;
use crate::infra::schools::SqliteSchoolStore;
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logs go to stderr so command output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db.clone() {
        config.db_path = db;
    }
    tracing::debug!(
        db_path = %config.db_path,
        moderation = %config.moderation,
        "Configuration loaded"
    );

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let moderator = match &config.banned_terms_file {
        Some(path) => ContentModerator::with_terms_file(path),
        None => ContentModerator::with_default_terms(),
    }
    .context("Failed to build the content moderator")?;
    let moderator = Arc::new(moderator);

    let pool = database::connect(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path))?;
    database::migrate_all(&pool)
        .await
        .context("Failed to migrate database")?;

    let accounts = AccountService::new_with_config(
        SqliteAccountStore::new(pool.clone()),
        AccountConfig {
            hash_iterations: config.hash_iterations,
        },
    );
    let forum = ForumService::new_with_policy(
        SqliteForumStore::new(pool.clone()),
        moderator,
        config.moderation,
    );
    let app = App::new(accounts, forum, SqliteSchoolStore::new(pool.clone()));
    tracing::debug!(policy = %app.forum.policy(), "Services ready");

    // ========================================================================
    // DISPATCH
    // ========================================================================

    let result = app.execute(cli.command).await;
    pool.close().await;

    print!("{}", result?);
    Ok(())
}

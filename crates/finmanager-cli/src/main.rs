//! FinManager CLI - local-first bookkeeping from the terminal
//!
//! Every command works against the local database; queued changes are
//! pushed to Supabase whenever a session and the network allow it.

mod auth;
mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::Context;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::ledger::{run_pay, run_receive};
use crate::commands::list::run_list;
use crate::commands::queue::run_queue;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::commands::update::run_update;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("finmanager_core=info,finmanager=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.config, cli.db_path, cli.no_sync)?;

    match cli.command {
        Commands::Add { collection, json } => run_add(&collection, json.as_deref(), &ctx).await?,
        Commands::List {
            collection,
            pending,
            json,
        } => run_list(&collection, pending, json, &ctx).await?,
        Commands::Show {
            collection,
            id,
            json,
        } => run_show(&collection, &id, json, &ctx).await?,
        Commands::Update {
            collection,
            id,
            json,
        } => run_update(&collection, &id, json.as_deref(), &ctx).await?,
        Commands::Delete { collection, id } => run_delete(&collection, &id, &ctx).await?,
        Commands::Pay { id } => run_pay(&id, &ctx).await?,
        Commands::Receive { id } => run_receive(&id, &ctx).await?,
        Commands::Queue { json } => run_queue(json, &ctx).await?,
        Commands::Sync { offline, watch } => run_sync(offline, watch, &ctx).await?,
        Commands::Auth { command } => run_auth(command, &ctx).await?,
        Commands::Config { command } => run_config(command, &ctx)?,
    }

    Ok(())
}

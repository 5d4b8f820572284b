use std::path::PathBuf;

use finmanager_core::config::AppConfig;
use finmanager_core::util::normalize_text_option;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::Context;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, ctx: &Context) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            default_db_path,
            remote_timeout_secs,
        } => run_config_init(
            ctx,
            ConfigInit {
                supabase_url,
                supabase_anon_key,
                default_db_path,
                remote_timeout_secs,
            },
        ),
        ConfigCommands::Show { json } => run_config_show(json, ctx),
    }
}

#[derive(Debug, Default)]
pub struct ConfigInit {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub default_db_path: Option<PathBuf>,
    pub remote_timeout_secs: Option<u64>,
}

/// Merge explicit values into the config file, keeping anything not given.
pub fn run_config_init(ctx: &Context, init: ConfigInit) -> Result<(), CliError> {
    // Start from the file alone so env overrides are not persisted.
    let mut config = AppConfig::load_from_path(&ctx.config_path).map_err(CliError::Config)?;
    merge_init(&mut config, init);
    config.supabase().map_err(CliError::Config)?;

    config
        .save_to_path(&ctx.config_path)
        .map_err(CliError::Config)?;
    println!("Config written to {}", ctx.config_path.display());

    if config.supabase().ok().flatten().is_some() {
        println!(
            "Sync is configured. Run `finmanager auth login --email <email> --password <password>`."
        );
    } else {
        println!("Sync is not configured; changes stay local until it is.");
    }
    Ok(())
}

pub fn merge_init(config: &mut AppConfig, init: ConfigInit) {
    if let Some(url) = normalize_text_option(init.supabase_url) {
        config.supabase_url = Some(url);
    }
    if let Some(key) = normalize_text_option(init.supabase_anon_key) {
        config.supabase_anon_key = Some(key);
    }
    if let Some(path) = init.default_db_path {
        config.db_path = Some(path);
    }
    if let Some(secs) = init.remote_timeout_secs {
        config.remote_timeout_secs = Some(secs);
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config_path: String,
    pub db_path: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub remote_timeout_secs: u64,
    pub sync_interval_secs: Option<u64>,
}

pub fn config_view(ctx: &Context) -> ConfigView {
    let engine = ctx.config.sync_engine_config();
    ConfigView {
        config_path: ctx.config_path.display().to_string(),
        db_path: ctx.db_path.display().to_string(),
        supabase_url: ctx.config.supabase_url.clone(),
        supabase_anon_key: ctx.config.supabase_anon_key.as_deref().map(redact_key),
        remote_timeout_secs: engine.remote_timeout.as_secs(),
        sync_interval_secs: engine.sync_interval.map(|interval| interval.as_secs()),
    }
}

fn run_config_show(as_json: bool, ctx: &Context) -> Result<(), CliError> {
    let view = config_view(ctx);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("config:         {}", view.config_path);
    println!("database:       {}", view.db_path);
    println!(
        "supabase_url:   {}",
        view.supabase_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "anon_key:       {}",
        view.supabase_anon_key.as_deref().unwrap_or("(not set)")
    );
    println!("remote_timeout: {}s", view.remote_timeout_secs);
    match view.sync_interval_secs {
        Some(secs) => println!("sync_interval:  {secs}s"),
        None => println!("sync_interval:  off"),
    }
    Ok(())
}

/// Keep only the first few characters of a key.
pub fn redact_key(key: &str) -> String {
    let prefix = key.chars().take(6).collect::<String>();
    format!("{prefix}...")
}

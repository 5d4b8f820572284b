use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "finmanager")]
#[command(about = "Local-first bookkeeping for small businesses")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip the sync attempt that follows every local change
    #[arg(long, global = true)]
    pub no_sync: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a record from a JSON object of fields
    #[command(alias = "new")]
    Add {
        /// Collection name (suppliers, payables, cash-sessions, ...)
        collection: String,
        /// Fields as JSON; read from stdin when omitted
        #[arg(long, value_name = "JSON")]
        json: Option<String>,
    },
    /// List records of a collection
    List {
        collection: String,
        /// Only records with unsynced changes
        #[arg(long)]
        pending: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record
    Show {
        collection: String,
        /// Record ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Patch fields of a record
    #[command(alias = "edit")]
    Update {
        collection: String,
        /// Record ID or unique ID prefix
        id: String,
        /// Changed fields as JSON; read from stdin when omitted
        #[arg(long, value_name = "JSON")]
        json: Option<String>,
    },
    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        collection: String,
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Mark a payable as paid
    Pay {
        /// Payable ID or unique ID prefix
        id: String,
    },
    /// Mark a receivable as received
    Receive {
        /// Receivable ID or unique ID prefix
        id: String,
    },
    /// Show changes waiting to be synced
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push queued changes to the remote service
    Sync {
        /// Treat the network as down without probing it
        #[arg(long)]
        offline: bool,
        /// Keep running and sync on reconnect and every `sync_interval_secs`
        #[arg(long)]
        watch: bool,
    },
    /// Manage the Supabase session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Default local database file
        #[arg(long, value_name = "PATH")]
        default_db_path: Option<PathBuf>,
        /// Seconds before a remote call counts as unreachable
        #[arg(long, value_name = "SECS")]
        remote_timeout_secs: Option<u64>,
    },
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password
    Login {
        /// Supabase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show the stored session
    Status,
    /// Sign out and clear the stored session
    Logout,
}

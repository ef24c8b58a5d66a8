//! Command-line arguments for the `kospi` binary.
//!
//! Every flag also reads an environment variable so the server can be
//! configured the way hosted deployments usually are.
//!
//! ```bash
//! # Serve the endpoint backed by a PostgREST store
//! KOSPI_STORE_URL=https://xyz.example.co KOSPI_STORE_KEY=... kospi serve
//!
//! # Print the current top 10 from a local DuckDB cache
//! kospi --store duckdb top
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "kospi",
    author,
    version,
    about = "KOSPI market-cap top 10, scraped and cached"
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Cache time-to-live in seconds.
    #[arg(long, global = true, env = "KOSPI_CACHE_TTL_SECS", default_value_t = 600)]
    pub ttl_secs: u32,

    /// Upstream request timeout in milliseconds.
    #[arg(long, global = true, env = "KOSPI_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Run one read pass and print the ranking.
    Top,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "KOSPI_BIND", default_value = "127.0.0.1:3000")]
    pub bind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// PostgREST-compatible HTTP store (needs URL and key).
    Rest,
    /// Embedded DuckDB file.
    Duckdb,
    /// Process memory; lost on exit.
    Memory,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Snapshot store backend.
    #[arg(long = "store", global = true, env = "KOSPI_STORE", value_enum, default_value_t = StoreBackend::Rest)]
    pub backend: StoreBackend,

    /// REST store endpoint URL.
    #[arg(long, global = true, env = "KOSPI_STORE_URL")]
    pub store_url: Option<String>,

    /// REST store access key.
    #[arg(long, global = true, env = "KOSPI_STORE_KEY", hide_env_values = true)]
    pub store_key: Option<String>,

    /// DuckDB file path (defaults to `$KOSPI_HOME/cache/top10.duckdb`).
    #[arg(long, global = true, env = "KOSPI_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

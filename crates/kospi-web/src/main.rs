use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kospi_core::format::{format_change, format_kst, format_pct, format_price};
use kospi_core::{
    CacheConfig, Crawler, CrawlerConfig, HttpClient, MemorySnapshotStore, RestSnapshotStore,
    RestStoreConfig, ReqwestHttpClient, SnapshotStore, StockService, StocksPayload,
};
use kospi_warehouse::{DuckDbSnapshotStore, Warehouse, WarehouseConfig};
use kospi_web::cli::{Cli, Command, StoreArgs, StoreBackend};
use kospi_web::error::CliError;
use kospi_web::telemetry::init_tracing;
use time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let store = open_store(&cli.store, Arc::clone(&http))?;
    let crawler = Crawler::new(
        http,
        CrawlerConfig {
            timeout_ms: cli.timeout_ms,
            ..CrawlerConfig::default()
        },
    );
    let cache = CacheConfig {
        ttl: Duration::seconds(i64::from(cli.ttl_secs)),
    };
    let service = Arc::new(StockService::new(store, crawler, cache.ttl));

    match cli.command {
        Command::Serve(args) => {
            let listener = tokio::net::TcpListener::bind(&args.bind).await?;
            info!(target: "kospi::api", bind = %args.bind, "listening; GET /api/stocks");
            axum::serve(listener, kospi_web::router(service)).await?;
        }
        Command::Top => {
            let payload = service.load().await?;
            print_table(&payload);
        }
    }

    Ok(())
}

/// Builds the store once at startup; missing REST credentials fail here.
fn open_store(
    args: &StoreArgs,
    http: Arc<dyn HttpClient>,
) -> Result<Arc<dyn SnapshotStore>, CliError> {
    let store: Arc<dyn SnapshotStore> = match args.backend {
        StoreBackend::Rest => {
            let config =
                RestStoreConfig::from_parts(args.store_url.clone(), args.store_key.clone())?;
            info!(target: "kospi::store", endpoint = %config.endpoint, "using REST store");
            Arc::new(RestSnapshotStore::new(http, config))
        }
        StoreBackend::Duckdb => {
            let mut config = WarehouseConfig::default();
            if let Some(path) = &args.db_path {
                config.db_path = path.clone();
            }
            let warehouse = Warehouse::open(config)?;
            info!(target: "kospi::store", path = %warehouse.db_path().display(), "using DuckDB store");
            Arc::new(DuckDbSnapshotStore::new(warehouse))
        }
        StoreBackend::Memory => {
            info!(target: "kospi::store", "using in-memory store");
            Arc::new(MemorySnapshotStore::new())
        }
    };
    Ok(store)
}

fn print_table(payload: &StocksPayload) {
    let source = match payload.source {
        kospi_core::Provenance::Cache => "cache",
        kospi_core::Provenance::Crawl => "crawl",
    };
    match payload.data.first() {
        Some(first) => println!(
            "KOSPI top {} ({source}, {})",
            payload.data.len(),
            format_kst(first.updated_at)
        ),
        None => println!("KOSPI top 0 ({source})"),
    }

    for record in &payload.data {
        let row = &record.row;
        println!(
            "{:>2}  {:<8} {:<20} {:>12} {:>10} {:>8}",
            row.rank,
            row.stock_code,
            row.company_name,
            format_price(row.price),
            format_change(row.change),
            format_pct(row.change_pct),
        );
    }
}

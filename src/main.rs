mod chain;
mod config;
mod errors;
mod models;
mod scanner;
mod state;

use crate::chain::snapshot::{MarketDataSource, SnapshotFile};
use crate::models::black_scholes::expected_move_one_sigma;
use crate::scanner::{time_to_expiry, EdgeScanner};
use crate::state::CancelToken;
use std::time::Instant;

#[tokio::main]
async fn main() {
    // Structured logging on stderr; stdout carries the ranked results
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("put_edge scanner starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Load market inputs
    let snapshot = match SnapshotFile::load(&cfg.snapshot_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("snapshot error: {e}");
            std::process::exit(1);
        }
    };

    let returns = match snapshot.daily_returns() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("returns error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        path = %cfg.snapshot_path.display(),
        spot = snapshot.spot(),
        expiry = snapshot.expiry(),
        puts = snapshot.puts().len(),
        returns = returns.len(),
        "market snapshot loaded"
    );

    let scanner = match EdgeScanner::new(cfg.scan.clone(), cfg.jump) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("scanner config error: {e}");
            std::process::exit(1);
        }
    };

    // Ctrl-C stops the scan between candidates
    let cancel = CancelToken::new();
    let ctrlc_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling scan");
            ctrlc_token.cancel();
        }
    });

    // The scan is CPU-bound; keep it off the async workers
    let started = Instant::now();
    let job = tokio::task::spawn_blocking(move || {
        let result = scanner.scan(
            snapshot.puts(),
            snapshot.spot(),
            snapshot.expiry(),
            &returns,
            &cancel,
        );
        (result, snapshot, scanner)
    });

    let (result, snapshot, scanner) = match job.await {
        Ok(out) => out,
        Err(e) => {
            tracing::error!("scan task failed: {e}");
            std::process::exit(1);
        }
    };

    let records = match result {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("scan error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        results = records.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        seed = scanner.params().seed,
        "scan finished"
    );

    if records.is_empty() {
        tracing::warn!("no mispriced puts found; try lowering min edge or loosening liquidity filters");
    }

    // 1-sigma move for the top candidate's IV
    if let Some(top) = records.first() {
        let ttl_years = time_to_expiry(snapshot.expiry(), chrono::Utc::now()).unwrap_or(0.0);
        match expected_move_one_sigma(snapshot.spot(), top.iv, ttl_years) {
            Some(em) => tracing::info!(
                strike = top.strike,
                iv = top.iv,
                expected_move = em,
                edge_itm = top.edge_itm,
                ev_per_contract = top.ev_per_contract,
                "top candidate"
            ),
            None => tracing::info!(strike = top.strike, "top candidate (no expected move)"),
        }
    }

    match serde_json::to_string_pretty(&records) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("serialize error: {e}");
            std::process::exit(1);
        }
    }
}

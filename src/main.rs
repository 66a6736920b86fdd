//! Price pusher: keeps today's electricity prices cached and pushes the
//! current price to InfluxDB.
//!
//! Single-binary Tokio application that:
//! 1. Loads today's prices (fatal if this fails)
//! 2. Refreshes them just after every local midnight
//! 3. Pushes the current price on a fixed tick
//! 4. Reloads on SIGHUP

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use common::{PusherConfig, PRICE_LOCALE};
use elpris_client::ElprisClient;
use influx_client::InfluxClient;
use price_cache::{run_midnight_refresh, run_push_loop, PriceCache, SystemClock};

/// Electricity price pusher
#[derive(Parser)]
#[command(name = "price-pusher", about = "Push current electricity prices to InfluxDB")]
struct Cli {
    /// Config file (default: ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Price region: SE1, SE2, SE3 or SE4.
    #[arg(long)]
    region: Option<String>,

    /// InfluxDB address.
    #[arg(long)]
    influx_addr: Option<String>,

    /// InfluxDB token.
    #[arg(long)]
    influx_token: Option<String>,

    /// Seconds between pushes.
    #[arg(long)]
    push_interval_secs: Option<u64>,

    /// Load prices, log the current one, and exit without pushing.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn overrides(&self) -> config::CliOverrides {
        config::CliOverrides {
            region: self.region.clone(),
            influx_addr: self.influx_addr.clone(),
            influx_token: self.influx_token.clone(),
            push_interval_secs: self.push_interval_secs,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "price_pusher=info,price_cache=info,elpris_client=info,influx_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Price pusher starting up...");

    // Load configuration.
    let cfg = match config::load_config(cli.config.as_deref(), &cli.overrides()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    log_config(&cfg);

    let source = match ElprisClient::new(
        cfg.price_api.base_url.clone(),
        Duration::from_secs(cfg.price_api.timeout_secs),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Price API client initialization failed: {}", e);
            std::process::exit(1);
        }
    };
    let sink = match InfluxClient::new(&cfg.influx) {
        Ok(c) => c,
        Err(e) => {
            error!("InfluxDB client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let cache = Arc::new(PriceCache::new(
        Arc::new(source),
        Arc::new(SystemClock),
        cfg.region,
    ));

    if let Err(e) = cache.load_prices().await {
        error!("Initial price load failed: {}", e);
        std::process::exit(1);
    }

    // ── Dry-run mode ─────────────────────────────────────────────────
    if cli.dry_run {
        match cache.current_interval().await {
            Ok(interval) => info!(
                "Current price: {:.5} SEK/kWh ({:.5} EUR/kWh, EXR {:.4}) for {} to {}",
                interval.price_sek,
                interval.price_eur,
                interval.exchange_rate,
                interval.start.with_timezone(&PRICE_LOCALE),
                interval.end.with_timezone(&PRICE_LOCALE),
            ),
            Err(e) => warn!("{}", e),
        }
        return;
    }

    // ── Spawn tasks ──────────────────────────────────────────────────
    let refresh_handle = tokio::spawn(run_midnight_refresh(cache.clone()));

    let push_handle = tokio::spawn(run_push_loop(
        cache.clone(),
        Arc::new(sink),
        cfg.timing.push_interval(),
    ));

    let reload_handle = tokio::spawn(reload_on_hangup(cache.clone()));

    info!("Started");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = refresh_handle => {
            error!("Refresh task exited: {:?}", r);
        }
        r = push_handle => {
            error!("Push task exited: {:?}", r);
        }
        r = reload_handle => {
            error!("Reload task exited: {:?}", r);
        }
    }

    info!("Price pusher shut down.");
}

fn log_config(cfg: &PusherConfig) {
    info!(
        "Region: {}, locale: {}, price API: {}",
        cfg.region,
        PRICE_LOCALE.name(),
        cfg.price_api.base_url
    );
    info!(
        "InfluxDB: {} (org={}, bucket={}), push every {}s",
        cfg.influx.addr, cfg.influx.org, cfg.influx.bucket, cfg.timing.push_interval_secs
    );
}

/// Reload prices whenever the process receives SIGHUP.
#[cfg(unix)]
async fn reload_on_hangup(cache: Arc<PriceCache>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Cannot listen for SIGHUP, manual reload disabled: {}", e);
            return std::future::pending().await;
        }
    };

    while hangups.recv().await.is_some() {
        info!("SIGHUP received, reloading prices");
        if let Err(e) = cache.load_prices().await {
            warn!("Manual price reload failed, keeping previous table: {}", e);
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_cache: Arc<PriceCache>) {
    std::future::pending().await
}

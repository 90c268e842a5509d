/// OddsBoard Live: odds-board
///
/// Initial load (API nebo zabalený JSON) → polling ticky (diff z API / syntéza)
/// → volitelně HTTP state endpoint pro prezentační vrstvu.
///
/// Konfigurace přes ODDSBOARD_* proměnné (.env se načte automaticky).

use anyhow::Result;
use logger::EventLogger;
use odds_feed::FeedClient;
use oddsboard_live::{
    state_server::{start_state_server, ServerState},
    AppConfig, DataSource, PollingScheduler, Store, UpdateMode,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

const HEARTBEAT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger::init_tracing();

    let config = AppConfig::from_env();

    info!("=== OddsBoard Live ===");
    info!(
        "Source: {} | mode: {} | interval: {}ms | feed: {}",
        config.data_source,
        config.store.update_mode,
        config.store.polling_interval_ms,
        config.fetcher.url
    );

    let client = Arc::new(FeedClient::new(config.fetcher.clone()));
    if config.data_source == DataSource::Remote || config.store.update_mode == UpdateMode::Api {
        if client.check_health().await {
            info!("feed reachable");
        } else {
            warn!("feed not reachable, continuing anyway");
        }
    }

    let mut store = Store::new(client, config.store.clone());
    if let Some(dir) = &config.log_dir {
        info!("audit log → {}", dir.display());
        store = store.with_event_logger(EventLogger::new(dir));
    }

    if let Err(e) = store.load_initial(config.data_source).await {
        warn!("initial load failed: {} (retry via POST /retry)", e);
    }

    let scheduler = Arc::new(Mutex::new(PollingScheduler::new(store.clone())));
    scheduler.lock().start();

    if let Some(bind) = config.bind {
        let state = ServerState {
            store: store.clone(),
            scheduler: scheduler.clone(),
            data_source: config.data_source,
        };
        tokio::spawn(async move {
            let _ = start_state_server(state, bind).await;
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, stopping");
        }
        _ = heartbeat(store.clone()) => {}
    }

    scheduler.lock().stop();
    Ok(())
}

async fn heartbeat(store: Store) {
    let mut ticker = interval(Duration::from_secs(HEARTBEAT_SECS));
    ticker.tick().await;
    loop {
        ticker.tick().await;
        store.read(|s| {
            info!(
                "📊 {} matches ({} hot) | {:?} | api calls: {} | errors: {}",
                s.match_count(),
                s.hot_matches().len(),
                s.connection_status(),
                s.api_call_count(),
                s.error_history_len()
            );
        });
    }
}

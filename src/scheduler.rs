//! Polling scheduler: periodický update tick nad storem.
//!
//! Drží nejvýš jeden aktivní timer. Fetch a reset trendů běží jako samostatné
//! tasky, `stop` je neruší.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::state::{MatchesAction, UpdateMode};
use crate::store::Store;

pub struct PollingScheduler {
    store: Store,
    timer: Option<JoinHandle<()>>,
}

impl PollingScheduler {
    pub fn new(store: Store) -> Self {
        Self { store, timer: None }
    }

    /// Interval a režim se čtou teď; změna za běhu se projeví až dalším `start`.
    pub fn start(&mut self) {
        self.stop();

        let (interval_ms, mode) = self.store.read(|s| (s.polling_interval_ms(), s.update_mode()));
        info!("starting auto-updates with {} mode, interval {}ms", mode, interval_ms);

        let store = self.store.clone();
        self.timer = Some(tokio::spawn(poll_loop(
            store,
            Duration::from_millis(interval_ms),
            mode,
        )));
    }

    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!("auto-updates stopped");
        }
    }

    /// Přepne režim a případně restartuje běžící timer.
    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.store.dispatch(MatchesAction::SetUpdateMode(mode));
        if self.is_running() {
            self.start();
        }
    }

    pub fn set_polling_interval(&mut self, ms: u64) {
        self.store.dispatch(MatchesAction::SetPollingInterval(ms));
        if self.is_running() {
            self.start();
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(store: Store, period: Duration, mode: UpdateMode) {
    // první tick až po celé periodě
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        poll_tick(&store, mode);
    }
}

/// Jeden tick. Vrací false, když se nic nespustilo (vypnuto / prázdný board).
pub fn poll_tick(store: &Store, mode: UpdateMode) -> bool {
    let (enabled, has_matches) =
        store.read(|s| (s.is_auto_update_enabled(), s.match_count() > 0));
    if !enabled || !has_matches {
        debug!("poll tick skipped (enabled={}, has_matches={})", enabled, has_matches);
        return false;
    }

    let use_real_api = mode == UpdateMode::Api;
    if use_real_api {
        store.dispatch(MatchesAction::IncrementApiCallCount);
    }

    let updater = store.clone();
    tokio::spawn(async move {
        if let Err(e) = updater.fetch_updates(use_real_api).await {
            warn!("update tick failed: {}", e);
        }
    });
    store.schedule_trend_reset();
    true
}

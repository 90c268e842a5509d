//! Store: sdílený handle nad `MatchesState` + asynchronní lifecycle operace.
//!
//! Lock se drží jen po dobu jedné `apply`, nikdy přes `.await`.

use logger::{now_iso, ErrorRecordedEvent, EventLogger, MatchesLoadedEvent, PollTickEvent};
use odds_engine::{
    calculate_trend, diff_updates, nudge_odds, synthesize_updates, OddsDirective, SynthesisConfig,
    INLINE_VOLATILITY,
};
use odds_feed::{
    normalize_all, parse_snapshot, EventSource, FetchError, Match, MatchId, NormalizeReport,
    Outcome, SnapshotError, Trend,
};
use parking_lot::RwLock;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{
    ErrorKind, MatchesAction, MatchesState, UpdateMode, DEFAULT_POLLING_INTERVAL_MS,
};

/// Zabalený snapshot pro režim bez sítě.
pub const BUNDLED_SNAPSHOT: &str = include_str!("../data/matches.json");

pub const TREND_RESET_DELAY: Duration = Duration::from_millis(2000);
pub const MOCK_UPDATE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Remote,
    Bundled,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Remote => "api",
            DataSource::Bundled => "json",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "remote" => Ok(DataSource::Remote),
            "json" | "bundled" => Ok(DataSource::Bundled),
            other => Err(format!("unknown data source `{other}` (use api or json)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("API Error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Snapshot Error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("retry limit reached after {0} attempts")]
    RetryLimit(u32),
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub update_mode: UpdateMode,
    pub polling_interval_ms: u64,
    pub synthesis: SynthesisConfig,
    /// Při selhání fetch v update ticku místo chyby syntetizovat změny.
    pub fallback_to_mock: bool,
    pub mock_update_delay: Duration,
    pub trend_reset_delay: Duration,
    /// Vlastní snapshot místo zabaleného `data/matches.json`.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::Api,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            synthesis: SynthesisConfig::default(),
            fallback_to_mock: true,
            mock_update_delay: MOCK_UPDATE_DELAY,
            trend_reset_delay: TREND_RESET_DELAY,
            snapshot_path: None,
        }
    }
}

#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<MatchesState>>,
    source: Arc<dyn EventSource>,
    config: Arc<StoreConfig>,
    events: Option<EventLogger>,
}

impl Store {
    pub fn new(source: Arc<dyn EventSource>, config: StoreConfig) -> Self {
        let mut state = MatchesState::default();
        state.apply(MatchesAction::SetUpdateMode(config.update_mode));
        state.apply(MatchesAction::SetPollingInterval(config.polling_interval_ms));

        Self {
            state: Arc::new(RwLock::new(state)),
            source,
            config: Arc::new(config),
            events: None,
        }
    }

    pub fn with_event_logger(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn dispatch(&self, action: MatchesAction) {
        self.state.write().apply(action);
    }

    pub fn read<T>(&self, f: impl FnOnce(&MatchesState) -> T) -> T {
        f(&self.state.read())
    }

    pub fn snapshot(&self) -> MatchesState {
        self.state.read().clone()
    }

    // ── Lifecycle operace ───────────────────────────────────────────────────

    pub async fn load_initial(&self, source: DataSource) -> Result<usize, LifecycleError> {
        self.dispatch(MatchesAction::InitialLoadPending);

        match self.load_matches(source).await {
            Ok(report) => {
                let count = report.matches.len();
                info!("initial load from {}: {} matches ({} dropped)", source, count, report.dropped);
                self.log_loaded("initial", source, &report);
                self.dispatch(MatchesAction::InitialLoadFulfilled(report.matches));
                Ok(count)
            }
            Err(e) => {
                warn!("initial load from {} failed: {}", source, e);
                let message = e.to_string();
                self.dispatch(MatchesAction::InitialLoadRejected(message.clone()));
                self.log_error(ErrorKind::Api, &message);
                Err(e)
            }
        }
    }

    /// Jen když ještě zbývají pokusy; jinak chyba bez zásahu do stavu.
    pub async fn retry_initial_load(&self, source: DataSource) -> Result<usize, LifecycleError> {
        let (can_retry, attempts) = self.read(|s| (s.can_retry(), s.retry_count()));
        if !can_retry {
            warn!("retry refused, {} attempts already used", attempts);
            return Err(LifecycleError::RetryLimit(attempts));
        }
        info!("retrying initial load (attempt {})", attempts + 1);
        self.load_initial(source).await
    }

    /// Jeden update tick. Vrací počet aplikovaných direktiv.
    pub async fn fetch_updates(&self, use_real_api: bool) -> Result<usize, LifecycleError> {
        self.dispatch(MatchesAction::UpdatesPending);
        let current = self.read(|s| s.matches().to_vec());

        match self.generate_updates(use_real_api, &current).await {
            Ok(directives) => {
                let count = directives.len();
                debug!("applying {} odds updates", count);
                self.dispatch(MatchesAction::UpdatesFulfilled(directives));
                self.log_tick(use_real_api, count);
                Ok(count)
            }
            Err(e) => {
                let message = e.to_string();
                self.dispatch(MatchesAction::UpdatesRejected(message.clone()));
                self.log_error(ErrorKind::Update, &message);
                Err(e)
            }
        }
    }

    pub async fn refresh_all(&self) -> Result<usize, LifecycleError> {
        self.dispatch(MatchesAction::RefreshPending);

        match self.load_matches(DataSource::Remote).await {
            Ok(report) => {
                let count = report.matches.len();
                info!("refreshed {} matches", count);
                self.log_loaded("refresh", DataSource::Remote, &report);
                self.dispatch(MatchesAction::RefreshFulfilled(report.matches));
                Ok(count)
            }
            Err(e) => {
                warn!("refresh failed: {}", e);
                let message = e.to_string();
                self.dispatch(MatchesAction::RefreshRejected(message.clone()));
                self.log_error(ErrorKind::Refresh, &message);
                Err(e)
            }
        }
    }

    /// Ruční tick jedné ceny (klik na odds). Trend se sám vrátí na neutral.
    pub fn nudge_outcome(&self, match_id: &MatchId, outcome: Outcome) -> Option<OddsDirective> {
        let current = self.read(|s| s.match_by_id(match_id).map(|m| m.odds.get(outcome)))?;
        let new_odds = {
            let mut rng = rand::thread_rng();
            nudge_odds(current, INLINE_VOLATILITY, &mut rng)
        };

        let directive = OddsDirective {
            match_id: match_id.clone(),
            outcome,
            new_odds,
            trend: calculate_trend(current, new_odds),
        };
        self.dispatch(MatchesAction::BatchUpdate(vec![directive.clone()]));

        let store = self.clone();
        let id = match_id.clone();
        let delay = self.config.trend_reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.dispatch(MatchesAction::UpdateTrend {
                match_id: id,
                outcome,
                trend: Trend::Neutral,
            });
        });

        Some(directive)
    }

    /// Plošný reset trendů po `trend_reset_delay`. Běží nezávisle na scheduleru.
    pub fn schedule_trend_reset(&self) -> JoinHandle<()> {
        let store = self.clone();
        let delay = self.config.trend_reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.dispatch(MatchesAction::ResetTrends);
        })
    }

    // ── interní ──────────────────────────────────────────────────────────────

    async fn load_matches(&self, source: DataSource) -> Result<NormalizeReport, LifecycleError> {
        match source {
            DataSource::Remote => {
                let events = self.source.fetch_events().await?;
                Ok(normalize_all(&events))
            }
            DataSource::Bundled => match &self.config.snapshot_path {
                Some(path) => {
                    let raw = tokio::fs::read_to_string(path)
                        .await
                        .map_err(SnapshotError::from)?;
                    Ok(parse_snapshot(&raw)?)
                }
                None => Ok(parse_snapshot(BUNDLED_SNAPSHOT)?),
            },
        }
    }

    async fn generate_updates(
        &self,
        use_real_api: bool,
        current: &[Match],
    ) -> Result<Vec<OddsDirective>, LifecycleError> {
        if use_real_api && !current.is_empty() {
            match self.source.fetch_events().await {
                Ok(events) => {
                    let fresh = normalize_all(&events);
                    let updates = diff_updates(current, &fresh.matches);
                    info!("generated {} real odds updates from API", updates.len());
                    return Ok(updates);
                }
                Err(e) if self.config.fallback_to_mock => {
                    warn!("failed to get real updates, falling back to mock: {}", e);
                    return Ok(self.synthesize(current));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tokio::time::sleep(self.config.mock_update_delay).await;
        Ok(self.synthesize(current))
    }

    fn synthesize(&self, current: &[Match]) -> Vec<OddsDirective> {
        let mut rng = rand::thread_rng();
        synthesize_updates(current, &self.config.synthesis, &mut rng)
    }

    fn log_loaded(&self, operation: &str, source: DataSource, report: &NormalizeReport) {
        if let Some(events) = &self.events {
            events.log_quiet(&MatchesLoadedEvent {
                ts: now_iso(),
                event: "MATCHES_LOADED",
                operation: operation.to_string(),
                source: source.to_string(),
                total: report.total,
                dropped: report.dropped,
            });
        }
    }

    fn log_tick(&self, use_real_api: bool, directives: usize) {
        if let Some(events) = &self.events {
            events.log_quiet(&PollTickEvent {
                ts: now_iso(),
                event: "POLL_TICK",
                mode: if use_real_api { "api" } else { "mock" }.to_string(),
                directives,
                api_call_count: self.read(|s| s.api_call_count()),
            });
        }
    }

    fn log_error(&self, kind: ErrorKind, message: &str) {
        if let Some(events) = &self.events {
            events.log_quiet(&ErrorRecordedEvent {
                ts: now_iso(),
                event: "ERROR_RECORDED",
                kind: kind.as_str().to_string(),
                message: message.to_string(),
                details: None,
            });
        }
    }
}

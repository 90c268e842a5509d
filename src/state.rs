//! Stav boardu a jeho jediné mutační vstupy.
//!
//! Každá změna je jedna `MatchesAction` aplikovaná synchronně přes
//! `MatchesState::apply`, takže přechod stavu je vždy atomický.

use chrono::{DateTime, Utc};
use odds_engine::OddsDirective;
use odds_feed::{Match, MatchId, Outcome, Trend};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const ERROR_HISTORY_CAP: usize = 10;
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 5000;
pub const MIN_POLLING_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_PAGE_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Api,
    Mock,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Api => "api",
            UpdateMode::Mock => "mock",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(UpdateMode::Api),
            "mock" => Ok(UpdateMode::Mock),
            other => Err(format!("unknown update mode `{other}` (use api or mock)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Api,
    Update,
    Refresh,
    General,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Api => "api",
            ErrorKind::Update => "update",
            ErrorKind::Refresh => "refresh",
            ErrorKind::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingOperation {
    Initial,
    Updates,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadingStates {
    pub initial: bool,
    pub updates: bool,
    pub refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewError {
    pub message: String,
    pub kind: ErrorKind,
    pub details: Option<String>,
}

impl NewError {
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchesAction {
    UpdateOdds { match_id: MatchId, outcome: Outcome, new_odds: f64 },
    UpdateTrend { match_id: MatchId, outcome: Outcome, trend: Trend },
    BatchUpdate(Vec<OddsDirective>),
    ToggleAutoUpdate,
    SetUpdateMode(UpdateMode),
    SetPollingInterval(u64),
    ResetTrends,
    RecordError(NewError),
    ClearError,
    ClearErrorHistory,
    SetConnectionStatus(ConnectionStatus),
    IncrementRetryCount,
    ResetRetryCount,
    IncrementApiCallCount,
    ResetApiCallCount,
    SetLoadingState { operation: LoadingOperation, loading: bool },

    InitialLoadPending,
    InitialLoadFulfilled(Vec<Match>),
    InitialLoadRejected(String),
    UpdatesPending,
    UpdatesFulfilled(Vec<OddsDirective>),
    UpdatesRejected(String),
    RefreshPending,
    RefreshFulfilled(Vec<Match>),
    RefreshRejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchesState {
    matches: Vec<Match>,
    loading: bool,
    loading_states: LoadingStates,
    error: Option<String>,
    error_history: VecDeque<ErrorRecord>,
    connection_status: ConnectionStatus,
    is_auto_update_enabled: bool,
    update_mode: UpdateMode,
    polling_interval: u64,
    retry_count: u32,
    max_retries: u32,
    api_call_count: u64,
    last_api_call: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
}

impl Default for MatchesState {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
            loading: false,
            loading_states: LoadingStates::default(),
            error: None,
            error_history: VecDeque::with_capacity(ERROR_HISTORY_CAP + 1),
            connection_status: ConnectionStatus::Disconnected,
            is_auto_update_enabled: true,
            update_mode: UpdateMode::Api,
            polling_interval: DEFAULT_POLLING_INTERVAL_MS,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            api_call_count: 0,
            last_api_call: None,
            last_updated: None,
        }
    }
}

impl MatchesState {
    pub fn apply(&mut self, action: MatchesAction) {
        match action {
            MatchesAction::UpdateOdds { match_id, outcome, new_odds } => {
                let Some(m) = self.find_mut(&match_id) else {
                    debug!("odds update for unknown match {} ignored", match_id);
                    return;
                };
                if m.odds.set(outcome, new_odds) {
                    self.last_updated = Some(Utc::now());
                } else {
                    warn!("rejected odds {} for {}/{}", new_odds, match_id, outcome);
                }
            }
            MatchesAction::UpdateTrend { match_id, outcome, trend } => {
                if let Some(m) = self.find_mut(&match_id) {
                    m.trends.set(outcome, trend);
                }
            }
            MatchesAction::BatchUpdate(directives) => self.apply_batch(directives),
            MatchesAction::ToggleAutoUpdate => {
                self.is_auto_update_enabled = !self.is_auto_update_enabled;
            }
            MatchesAction::SetUpdateMode(mode) => self.update_mode = mode,
            MatchesAction::SetPollingInterval(ms) => {
                if ms < MIN_POLLING_INTERVAL_MS {
                    warn!("polling interval {}ms below {}ms, ignored", ms, MIN_POLLING_INTERVAL_MS);
                } else {
                    self.polling_interval = ms;
                }
            }
            MatchesAction::ResetTrends => {
                for m in &mut self.matches {
                    m.trends.reset();
                }
            }
            MatchesAction::RecordError(err) => self.record_error(err),
            MatchesAction::ClearError => self.error = None,
            MatchesAction::ClearErrorHistory => self.error_history.clear(),
            MatchesAction::SetConnectionStatus(status) => self.connection_status = status,
            MatchesAction::IncrementRetryCount => self.retry_count += 1,
            MatchesAction::ResetRetryCount => self.retry_count = 0,
            MatchesAction::IncrementApiCallCount => {
                self.api_call_count += 1;
                self.last_api_call = Some(Utc::now());
            }
            MatchesAction::ResetApiCallCount => {
                self.api_call_count = 0;
                self.last_api_call = None;
            }
            MatchesAction::SetLoadingState { operation, loading } => {
                self.set_loading_state(operation, loading);
            }

            MatchesAction::InitialLoadPending => {
                self.loading = true;
                self.loading_states.initial = true;
                self.connection_status = ConnectionStatus::Connecting;
                self.error = None;
            }
            MatchesAction::InitialLoadFulfilled(matches) => {
                self.loading = false;
                self.loading_states.initial = false;
                self.matches = matches;
                self.last_updated = Some(Utc::now());
                self.connection_status = ConnectionStatus::Connected;
                self.error = None;
                self.retry_count = 0;
            }
            MatchesAction::InitialLoadRejected(message) => {
                self.loading = false;
                self.loading_states.initial = false;
                self.connection_status = ConnectionStatus::Error;
                self.record_error(NewError::new(message.clone(), ErrorKind::Api).with_details(message));
                self.retry_count += 1;
            }

            // jen loadingStates.updates, globální `loading` zůstává
            MatchesAction::UpdatesPending => {
                self.loading_states.updates = true;
                self.error = None;
            }
            MatchesAction::UpdatesFulfilled(directives) => {
                self.loading_states.updates = false;
                self.apply_batch(directives);
                self.error = None;
            }
            MatchesAction::UpdatesRejected(message) => {
                self.loading_states.updates = false;
                self.record_error(NewError::new(message, ErrorKind::Update));
            }

            MatchesAction::RefreshPending => {
                self.loading = true;
                self.loading_states.refresh = true;
                self.error = None;
            }
            MatchesAction::RefreshFulfilled(matches) => {
                self.loading = false;
                self.loading_states.refresh = false;
                self.matches = matches;
                self.last_updated = Some(Utc::now());
                self.error = None;
            }
            MatchesAction::RefreshRejected(message) => {
                self.loading = false;
                self.loading_states.refresh = false;
                self.record_error(NewError::new(message.clone(), ErrorKind::Refresh).with_details(message));
            }
        }
    }

    fn find_mut(&mut self, id: &MatchId) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| &m.id == id)
    }

    fn apply_batch(&mut self, directives: Vec<OddsDirective>) {
        for d in directives {
            let Some(m) = self.find_mut(&d.match_id) else {
                continue;
            };
            if m.odds.set(d.outcome, d.new_odds) {
                m.trends.set(d.outcome, d.trend);
            }
        }
        self.last_updated = Some(Utc::now());
    }

    fn record_error(&mut self, err: NewError) {
        let record = ErrorRecord {
            message: err.message,
            timestamp: Utc::now(),
            kind: err.kind,
            details: err.details,
        };
        self.error = Some(record.message.clone());
        self.error_history.push_front(record);
        self.error_history.truncate(ERROR_HISTORY_CAP);
    }

    fn set_loading_state(&mut self, operation: LoadingOperation, loading: bool) {
        match operation {
            LoadingOperation::Initial => self.loading_states.initial = loading,
            LoadingOperation::Updates => self.loading_states.updates = loading,
            LoadingOperation::Refresh => self.loading_states.refresh = loading,
        }
    }

    // ── Selektory ────────────────────────────────────────────────────────────

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn match_by_id(&self, id: &MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| &m.id == id)
    }

    pub fn hot_matches(&self) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.is_hot).collect()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn loading_states(&self) -> LoadingStates {
        self.loading_states
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_history(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.error_history.iter()
    }

    pub fn error_history_len(&self) -> usize {
        self.error_history.len()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status == ConnectionStatus::Connected
    }

    pub fn is_auto_update_enabled(&self) -> bool {
        self.is_auto_update_enabled
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn polling_interval_ms(&self) -> u64 {
        self.polling_interval
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn api_call_count(&self) -> u64 {
        self.api_call_count
    }

    pub fn last_api_call(&self) -> Option<DateTime<Utc>> {
        self.last_api_call
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Stránka pro seznam karet. Stránka mimo rozsah spadne na první.
    pub fn page(&self, page: usize, per_page: usize) -> MatchPage {
        let per_page = per_page.max(1);
        let total_items = self.matches.len();
        let total_pages = total_items.div_ceil(per_page);
        let page = if page == 0 || page > total_pages { 1 } else { page };

        let start = ((page - 1) * per_page).min(total_items);
        let end = (start + per_page).min(total_items);

        MatchPage {
            items: self.matches[start..end].to_vec(),
            page,
            per_page,
            total_pages,
            total_items,
            start_item: if total_items == 0 { 0 } else { start + 1 },
            end_item: end,
        }
    }

    /// Serializovatelný pohled pro prezentační vrstvu, včetně odvozených polí.
    pub fn view(&self) -> StateView<'_> {
        StateView {
            ts: Utc::now(),
            match_count: self.match_count(),
            hot_match_ids: self.hot_matches().into_iter().map(|m| m.id.clone()).collect(),
            is_connected: self.is_connected(),
            can_retry: self.can_retry(),
            state: self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPage {
    pub items: Vec<Match>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub start_item: usize,
    pub end_item: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView<'a> {
    pub ts: DateTime<Utc>,
    pub match_count: usize,
    pub hot_match_ids: Vec<MatchId>,
    pub is_connected: bool,
    pub can_retry: bool,
    #[serde(flatten)]
    pub state: &'a MatchesState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_match;

    fn loaded(n: u64) -> MatchesState {
        let mut state = MatchesState::default();
        state.apply(MatchesAction::InitialLoadPending);
        state.apply(MatchesAction::InitialLoadFulfilled(
            (1..=n).map(|i| sample_match(i, 1.5, 3.2, 2.1)).collect(),
        ));
        state
    }

    #[test]
    fn defaults_match_the_board_contract() {
        let s = MatchesState::default();
        assert!(s.matches().is_empty());
        assert!(!s.is_loading());
        assert_eq!(s.connection_status(), ConnectionStatus::Disconnected);
        assert!(s.is_auto_update_enabled());
        assert_eq!(s.update_mode(), UpdateMode::Api);
        assert_eq!(s.polling_interval_ms(), 5000);
        assert_eq!(s.max_retries(), 3);
        assert!(s.can_retry());
    }

    #[test]
    fn odds_update_for_unknown_match_is_a_noop() {
        let mut state = loaded(2);
        let before = state.clone();
        state.apply(MatchesAction::UpdateOdds {
            match_id: MatchId::from(99),
            outcome: Outcome::Home,
            new_odds: 4.2,
        });
        state.apply(MatchesAction::UpdateTrend {
            match_id: MatchId::from(99),
            outcome: Outcome::Home,
            trend: Trend::Up,
        });
        assert_eq!(state, before);
    }

    #[test]
    fn odds_update_rounds_and_touches_marker() {
        let mut state = loaded(1);
        let marker = state.last_updated();
        state.apply(MatchesAction::UpdateOdds {
            match_id: MatchId::from(1),
            outcome: Outcome::Away,
            new_odds: 2.456,
        });
        assert_eq!(state.matches()[0].odds.away, 2.46);
        assert!(state.last_updated() >= marker);
    }

    #[test]
    fn batch_sets_odds_and_trends_together() {
        let mut state = loaded(3);
        state.apply(MatchesAction::BatchUpdate(vec![
            OddsDirective {
                match_id: MatchId::from(2),
                outcome: Outcome::Draw,
                new_odds: 3.5,
                trend: Trend::Up,
            },
            OddsDirective {
                match_id: MatchId::from(42),
                outcome: Outcome::Draw,
                new_odds: 9.9,
                trend: Trend::Up,
            },
        ]));

        let m = &state.matches()[1];
        assert_eq!(m.odds.draw, 3.5);
        assert_eq!(m.trends.draw, Trend::Up);
        assert_eq!(state.matches()[0].trends.draw, Trend::Neutral);

        state.apply(MatchesAction::ResetTrends);
        assert!(state
            .matches()
            .iter()
            .all(|m| m.trends == odds_feed::Trends::default()));
    }

    #[test]
    fn error_history_keeps_ten_most_recent() {
        let mut state = MatchesState::default();
        for n in 1..=12 {
            state.apply(MatchesAction::RecordError(NewError::new(
                format!("failure {n}"),
                ErrorKind::General,
            )));
        }

        assert_eq!(state.error_history_len(), 10);
        let messages: Vec<&str> = state.error_history().map(|e| e.message.as_str()).collect();
        assert_eq!(messages.first(), Some(&"failure 12"));
        assert_eq!(messages.last(), Some(&"failure 3"));
        assert_eq!(state.error(), Some("failure 12"));

        state.apply(MatchesAction::ClearError);
        assert_eq!(state.error(), None);
        assert_eq!(state.error_history_len(), 10);
        state.apply(MatchesAction::ClearErrorHistory);
        assert_eq!(state.error_history_len(), 0);
    }

    #[test]
    fn initial_load_lifecycle() {
        let mut state = MatchesState::default();
        state.apply(MatchesAction::InitialLoadPending);
        assert!(state.is_loading());
        assert!(state.loading_states().initial);
        assert_eq!(state.connection_status(), ConnectionStatus::Connecting);

        state.apply(MatchesAction::InitialLoadRejected("API Error: boom".into()));
        assert!(!state.is_loading());
        assert_eq!(state.connection_status(), ConnectionStatus::Error);
        assert_eq!(state.retry_count(), 1);
        assert_eq!(state.error(), Some("API Error: boom"));
        let last = state.error_history().next().unwrap();
        assert_eq!(last.kind, ErrorKind::Api);

        state.apply(MatchesAction::InitialLoadPending);
        assert_eq!(state.error(), None);
        state.apply(MatchesAction::InitialLoadFulfilled(vec![sample_match(1, 2.0, 3.0, 4.0)]));
        assert!(state.is_connected());
        assert_eq!(state.retry_count(), 0);
        assert_eq!(state.match_count(), 1);
    }

    #[test]
    fn update_lifecycle_never_sets_global_loading() {
        let mut state = loaded(1);
        state.apply(MatchesAction::UpdatesPending);
        assert!(!state.is_loading());
        assert!(state.loading_states().updates);

        state.apply(MatchesAction::UpdatesRejected("API Error: HTTP error! status: 503".into()));
        assert!(!state.loading_states().updates);
        assert_eq!(state.connection_status(), ConnectionStatus::Connected);
        assert_eq!(state.retry_count(), 0);
        assert!(state.error().is_some());
        assert_eq!(state.error_history().next().unwrap().kind, ErrorKind::Update);

        state.apply(MatchesAction::UpdatesPending);
        state.apply(MatchesAction::UpdatesFulfilled(vec![]));
        assert_eq!(state.error(), None);
    }

    #[test]
    fn refresh_failure_keeps_connection_bookkeeping() {
        let mut state = loaded(2);
        state.apply(MatchesAction::RefreshPending);
        assert!(state.is_loading());
        state.apply(MatchesAction::RefreshRejected("API Error: Request timeout".into()));
        assert!(!state.is_loading());
        assert!(state.is_connected());
        assert_eq!(state.retry_count(), 0);
        assert_eq!(state.match_count(), 2);
        assert_eq!(state.error(), Some("API Error: Request timeout"));
    }

    #[test]
    fn configuration_mutators() {
        let mut state = MatchesState::default();
        state.apply(MatchesAction::ToggleAutoUpdate);
        assert!(!state.is_auto_update_enabled());
        state.apply(MatchesAction::SetUpdateMode(UpdateMode::Mock));
        assert_eq!(state.update_mode(), UpdateMode::Mock);
        state.apply(MatchesAction::SetPollingInterval(2500));
        assert_eq!(state.polling_interval_ms(), 2500);
        state.apply(MatchesAction::SetPollingInterval(0));
        assert_eq!(state.polling_interval_ms(), 2500);

        state.apply(MatchesAction::IncrementApiCallCount);
        assert_eq!(state.api_call_count(), 1);
        assert!(state.last_api_call().is_some());
        state.apply(MatchesAction::ResetApiCallCount);
        assert_eq!(state.api_call_count(), 0);
        assert!(state.last_api_call().is_none());

        for _ in 0..3 {
            state.apply(MatchesAction::IncrementRetryCount);
        }
        assert!(!state.can_retry());
        state.apply(MatchesAction::ResetRetryCount);
        assert!(state.can_retry());

        state.apply(MatchesAction::SetLoadingState {
            operation: LoadingOperation::Refresh,
            loading: true,
        });
        assert!(state.loading_states().refresh);
        state.apply(MatchesAction::SetConnectionStatus(ConnectionStatus::Connected));
        assert!(state.is_connected());
    }

    #[test]
    fn paging_and_hot_selector() {
        let mut state = MatchesState::default();
        let mut matches: Vec<Match> = (1..=10).map(|i| sample_match(i, 1.5, 3.2, 2.1)).collect();
        matches[3].is_hot = true;
        matches[7].is_hot = true;
        state.apply(MatchesAction::InitialLoadFulfilled(matches));

        assert_eq!(state.hot_matches().len(), 2);

        let p3 = state.page(3, DEFAULT_PAGE_SIZE);
        assert_eq!(p3.total_pages, 3);
        assert_eq!(p3.items.len(), 2);
        assert_eq!((p3.start_item, p3.end_item), (9, 10));

        let out_of_range = state.page(9, DEFAULT_PAGE_SIZE);
        assert_eq!(out_of_range.page, 1);
        assert_eq!(out_of_range.items[0].id, MatchId::from(1));

        let empty = MatchesState::default().page(1, DEFAULT_PAGE_SIZE);
        assert_eq!((empty.total_pages, empty.start_item, empty.end_item), (0, 0, 0));
        assert!(empty.items.is_empty());
    }

    #[test]
    fn view_exposes_derived_fields() {
        let state = loaded(1);
        let json = serde_json::to_value(state.view()).unwrap();
        assert_eq!(json["isConnected"], true);
        assert_eq!(json["canRetry"], true);
        assert_eq!(json["matchCount"], 1);
        assert_eq!(json["connectionStatus"], "connected");
        assert_eq!(json["loadingStates"]["updates"], false);
        assert_eq!(json["matches"][0]["homeTeam"], "Home 1");
    }
}

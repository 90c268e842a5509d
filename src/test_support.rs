//! Sdílené fixtures pro unit testy root crate.

use async_trait::async_trait;
use chrono::Utc;
use odds_feed::{EventSource, FetchError, Match, MatchId, OddsBook, Trends};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn sample_match(id: u64, home: f64, draw: f64, away: f64) -> Match {
    Match {
        id: MatchId::from(id),
        time: "TBD".to_string(),
        home_team: format!("Home {id}"),
        away_team: format!("Away {id}"),
        league: "Football / Test League".to_string(),
        odds: OddsBook::new(home, draw, away),
        trends: Trends::default(),
        total_matches: 0,
        is_hot: false,
        last_updated: Utc::now(),
    }
}

/// Upstream tvar eventu, jak ho posílá feed.
pub fn raw_event(id: u64, home: f64, draw: f64, away: f64) -> Value {
    json!({
        "id": id,
        "homeTeam": format!("Home {id}"),
        "awayTeam": format!("Away {id}"),
        "category": "Football",
        "league": "Test League",
        "date": "2024-03-09T18:30:00Z",
        "odds": { "homeWin": home, "draw": draw, "awayWin": away },
        "betCount": 10 * id,
        "isHot": false
    })
}

/// Fake zdroj: vrací aktuálně nastavenou odpověď, volitelně se zpožděním.
pub struct ScriptedSource {
    response: Mutex<Result<Vec<Value>, FetchError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn with_events(events: Vec<Value>) -> Self {
        Self {
            response: Mutex::new(Ok(events)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_events(&self, events: Vec<Value>) {
        *self.response.lock() = Ok(events);
    }

    pub fn fail_with(&self, error: FetchError) {
        *self.response.lock() = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch_events(&self) -> Result<Vec<Value>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().clone()
    }
}

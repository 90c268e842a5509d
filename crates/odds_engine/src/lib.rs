//! Odds Engine: generování změn odds
//!
//! Dvě politiky, stejný výstup (`OddsDirective`):
//!   - diff: čerstvý snapshot z API proti aktuálnímu stavu
//!   - syntéza: náhodná perturbace, když živé srovnání není k dispozici
//!
//! Žádné I/O, RNG se předává zvenku.

use odds_feed::{round2, Match, MatchId, Outcome, Trend, MIN_ODDS};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimální změna, která se počítá jako pohyb.
pub const TREND_THRESHOLD: f64 = 0.01;
pub const DEFAULT_UPDATE_PROBABILITY: f64 = 0.3;
pub const DEFAULT_VOLATILITY: f64 = 0.15;
/// Ruční tick z tlačítka odds je hrubší.
pub const INLINE_VOLATILITY: f64 = 0.3;

/// Instrukce pro store: změň jednu cenu jednoho zápasu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsDirective {
    pub match_id: MatchId,
    pub outcome: Outcome,
    pub new_odds: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy)]
pub struct SynthesisConfig {
    /// Pravděpodobnost, že se zápas v ticku pohne (0-1).
    pub update_probability: f64,
    pub volatility: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            update_probability: DEFAULT_UPDATE_PROBABILITY,
            volatility: DEFAULT_VOLATILITY,
        }
    }
}

pub fn calculate_trend(old_odds: f64, new_odds: f64) -> Trend {
    let difference = new_odds - old_odds;
    if difference.abs() < TREND_THRESHOLD {
        Trend::Neutral
    } else if difference > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Relativní pohyb: `cur × (1 + (u - 0.5) × volatility)`, na setiny, min 1.01.
pub fn simulate_odds_change<R: Rng + ?Sized>(current: f64, volatility: f64, rng: &mut R) -> f64 {
    let variation = (rng.gen::<f64>() - 0.5) * volatility;
    let new_odds = current * (1.0 + variation);
    round2(new_odds).max(MIN_ODDS)
}

/// Absolutní pohyb pro ruční tick: `cur + (u - 0.5) × volatility`.
pub fn nudge_odds<R: Rng + ?Sized>(current: f64, volatility: f64, rng: &mut R) -> f64 {
    let variation = (rng.gen::<f64>() - 0.5) * volatility;
    round2(current + variation).max(MIN_ODDS)
}

/// Porovná jen zápasy přítomné v obou sadách. Nové/zmizelé zápasy se tu neřeší,
/// ty propíše až plný reload nebo refresh.
pub fn diff_updates(current: &[Match], fresh: &[Match]) -> Vec<OddsDirective> {
    let index: HashMap<&MatchId, &Match> = current.iter().map(|m| (&m.id, m)).collect();
    let mut updates = Vec::new();

    for fresh_match in fresh {
        let Some(current_match) = index.get(&fresh_match.id) else {
            continue;
        };

        for outcome in Outcome::ALL {
            let current_odds = current_match.odds.get(outcome);
            let new_odds = fresh_match.odds.get(outcome);

            if (current_odds - new_odds).abs() > TREND_THRESHOLD {
                updates.push(OddsDirective {
                    match_id: fresh_match.id.clone(),
                    outcome,
                    new_odds,
                    trend: if new_odds > current_odds { Trend::Up } else { Trend::Down },
                });
            }
        }
    }

    updates
}

/// Každý zápas se s pravděpodobností p pohne na jednom náhodném outcome.
pub fn synthesize_updates<R: Rng + ?Sized>(
    matches: &[Match],
    config: &SynthesisConfig,
    rng: &mut R,
) -> Vec<OddsDirective> {
    let mut updates = Vec::new();

    for m in matches {
        if rng.gen::<f64>() >= config.update_probability {
            continue;
        }

        let outcome = Outcome::ALL[rng.gen_range(0..Outcome::ALL.len())];
        let current_odds = m.odds.get(outcome);
        let new_odds = simulate_odds_change(current_odds, config.volatility, rng);

        updates.push(OddsDirective {
            match_id: m.id.clone(),
            outcome,
            new_odds,
            trend: calculate_trend(current_odds, new_odds),
        });
    }

    updates
}

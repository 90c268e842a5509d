//! Interní tvar zápasu, to, co drží store a co čte prezentační vrstva.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Spodní hranice decimálních odds po jakékoli simulované změně.
pub const MIN_ODDS: f64 = 1.01;

/// Zaokrouhlení na dvě desetinná místa (setiny).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Opaque id zápasu. Upstream posílá číslo i string, interně držíme text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Číslo nebo neprázdný string; cokoliv jiného není použitelné id.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for MatchId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for MatchId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        MatchId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("match id must be a string or number"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

/// Decimální ceny pro 1 / X / 2. Všechny tři jsou vždy přítomné.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsBook {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OddsBook {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self {
            home: round2(home),
            draw: round2(draw),
            away: round2(away),
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Zapíše cenu zaokrouhlenou na setiny. Nekonečno/NaN/<=0 se nezapíše.
    pub fn set(&mut self, outcome: Outcome, odds: f64) -> bool {
        if !odds.is_finite() || odds <= 0.0 {
            return false;
        }
        let slot = match outcome {
            Outcome::Home => &mut self.home,
            Outcome::Draw => &mut self.draw,
            Outcome::Away => &mut self.away,
        };
        *slot = round2(odds);
        true
    }

    pub fn all_positive(&self) -> bool {
        Outcome::ALL
            .iter()
            .all(|o| self.get(*o).is_finite() && self.get(*o) > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Trends {
    #[serde(default)]
    pub home: Trend,
    #[serde(default)]
    pub draw: Trend,
    #[serde(default)]
    pub away: Trend,
}

impl Trends {
    pub fn get(&self, outcome: Outcome) -> Trend {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn set(&mut self, outcome: Outcome, trend: Trend) {
        match outcome {
            Outcome::Home => self.home = trend,
            Outcome::Draw => self.draw = trend,
            Outcome::Away => self.away = trend,
        }
    }

    pub fn reset(&mut self) {
        *self = Trends::default();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    /// Už naformátováno pro zobrazení ("18:30 Sat 10/19" nebo "TBD").
    #[serde(default = "default_time")]
    pub time: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub league: String,
    pub odds: OddsBook,
    #[serde(default)]
    pub trends: Trends,
    #[serde(default)]
    pub total_matches: u64,
    #[serde(default)]
    pub is_hot: bool,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

fn default_time() -> String {
    "TBD".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_rounds_to_cents_and_rejects_garbage() {
        let mut odds = OddsBook::new(1.5, 3.2, 2.1);
        assert!(odds.set(Outcome::Draw, 3.14159));
        assert_eq!(odds.draw, 3.14);
        assert!(!odds.set(Outcome::Home, 0.0));
        assert!(!odds.set(Outcome::Home, f64::NAN));
        assert_eq!(odds.home, 1.5);
    }

    #[test]
    fn match_id_accepts_numbers_and_strings() {
        let from_num: MatchId = serde_json::from_str("42").unwrap();
        let from_str: MatchId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_num, from_str);
        assert!(serde_json::from_str::<MatchId>("null").is_err());
        assert!(serde_json::from_str::<MatchId>("\"  \"").is_err());
    }

    #[test]
    fn match_serializes_camel_case_for_the_board() {
        let m = Match {
            id: MatchId::from(7),
            time: "TBD".to_string(),
            home_team: "Sparta".to_string(),
            away_team: "Slavia".to_string(),
            league: "Football / Fortuna Liga".to_string(),
            odds: OddsBook::new(2.1, 3.3, 3.4),
            trends: Trends::default(),
            total_matches: 12,
            is_hot: true,
            last_updated: Utc::now(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["homeTeam"], "Sparta");
        assert_eq!(json["isHot"], true);
        assert_eq!(json["trends"]["draw"], "neutral");
        assert_eq!(json["id"], "7");
    }
}

//! Statický snapshot `{ "matches": [...] }` už v interním tvaru, fallback zdroj dat.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::error::SnapshotError;
use crate::model::{Match, OddsBook};
use crate::normalize::NormalizeReport;

#[derive(Debug, Deserialize)]
struct SnapshotDoc {
    #[serde(default)]
    matches: Vec<Value>,
}

/// Záznamy bez id/týmů/kladných odds se zahodí, zbytek projde beze změny tvaru.
pub fn parse_snapshot(raw: &str) -> Result<NormalizeReport, SnapshotError> {
    let doc: SnapshotDoc = serde_json::from_str(raw)?;
    let total = doc.matches.len();
    let mut seen = HashSet::new();
    let mut matches = Vec::with_capacity(total);

    for (index, value) in doc.matches.into_iter().enumerate() {
        let mut m: Match = match serde_json::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                warn!("snapshot match {} rejected: {}", index, e);
                continue;
            }
        };
        if !m.odds.all_positive() {
            warn!("snapshot match {} rejected: odds must be positive", m.id);
            continue;
        }
        if !seen.insert(m.id.clone()) {
            warn!("snapshot match {} rejected: duplicate id", m.id);
            continue;
        }
        m.odds = OddsBook::new(m.odds.home, m.odds.draw, m.odds.away);
        matches.push(m);
    }

    let dropped = total - matches.len();
    if dropped > 0 {
        warn!("{} invalid matches filtered out", dropped);
    }

    Ok(NormalizeReport { matches, total, dropped })
}

pub fn load_snapshot_file(path: impl AsRef<Path>) -> Result<NormalizeReport, SnapshotError> {
    let raw = std::fs::read_to_string(path)?;
    parse_snapshot(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_valid_records_and_drops_the_rest() {
        let raw = r#"{
            "matches": [
                { "id": 1, "time": "20:00 Fri 05/10", "homeTeam": "Ajax", "awayTeam": "PSV",
                  "league": "Football / Eredivisie", "odds": { "home": 2.05, "draw": 3.4, "away": 3.1 },
                  "trends": { "home": "up", "draw": "neutral", "away": "down" },
                  "totalMatches": 300, "isHot": true },
                { "id": 2, "homeTeam": "Feyenoord", "awayTeam": "AZ",
                  "odds": { "home": 1.9, "draw": 3.5, "away": 0 } },
                { "id": 3, "homeTeam": "Twente", "odds": { "home": 1.9, "draw": 3.5, "away": 4.0 } },
                { "id": 1, "homeTeam": "Dup", "awayTeam": "Dup", "odds": { "home": 2, "draw": 2, "away": 2 } },
                { "id": 4, "homeTeam": "Utrecht", "awayTeam": "Vitesse",
                  "odds": { "home": 1.8, "draw": 3.6, "away": 4.2 } }
            ]
        }"#;

        let report = parse_snapshot(raw).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.dropped, 3);
        assert_eq!(report.matches.len(), 2);
        assert!(report.matches[0].is_hot);
        assert_eq!(report.matches[1].time, "TBD");
    }

    #[test]
    fn missing_matches_key_is_empty() {
        let report = parse_snapshot("{}").unwrap();
        assert!(report.matches.is_empty());
        assert!(parse_snapshot("[1,2]").is_err());
    }
}

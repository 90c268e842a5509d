//! Upstream event → `Match`.
//!
//! Upstream JSON je nedůvěryhodný: každé pole se validuje nebo koerguje,
//! volitelná pole dostanou default. Vadný záznam se zahodí, batch běží dál.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::ValidationError;
use crate::model::{Match, MatchId, OddsBook, Trends};

pub const UNKNOWN_TEAM: &str = "Unknown Team";
pub const DEFAULT_CATEGORY: &str = "Sports";
pub const DEFAULT_LEAGUE: &str = "Unknown League";
pub const TIME_PLACEHOLDER: &str = "TBD";

/// Upstream záznam tak, jak přijde. Typy se řeší až při normalizaci.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: Option<Value>,
    pub date: Option<Value>,
    pub home_team: Option<Value>,
    pub away_team: Option<Value>,
    pub category: Option<Value>,
    pub league: Option<Value>,
    pub odds: Option<Value>,
    pub bet_count: Option<Value>,
    pub is_hot: Option<Value>,
}

impl RawEvent {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        if !value.is_object() {
            return Err(ValidationError::NotAnObject);
        }
        // všechna pole jsou Option<Value>, takže objekt se deserializuje vždy
        RawEvent::deserialize(value).map_err(|_| ValidationError::NotAnObject)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub matches: Vec<Match>,
    pub total: usize,
    pub dropped: usize,
}

pub fn normalize(value: &Value) -> Result<Match, ValidationError> {
    let raw = RawEvent::from_value(value)?;

    let id = required(&raw.id, "id")?;
    let id = MatchId::from_json(id).ok_or(ValidationError::InvalidField("id"))?;

    let home_team = team_name(required(&raw.home_team, "homeTeam")?, "homeTeam")?;
    let away_team = team_name(required(&raw.away_team, "awayTeam")?, "awayTeam")?;

    let odds = required(&raw.odds, "odds")?;
    if !odds.is_object() {
        return Err(ValidationError::InvalidField("odds"));
    }
    let home = positive_odds(&odds["homeWin"], "homeWin")?;
    let draw = positive_odds(&odds["draw"], "draw")?;
    let away = positive_odds(&odds["awayWin"], "awayWin")?;

    let category = display_text(raw.category.as_ref()).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let league = display_text(raw.league.as_ref()).unwrap_or_else(|| DEFAULT_LEAGUE.to_string());

    Ok(Match {
        id,
        time: format_event_time(raw.date.as_ref()),
        home_team,
        away_team,
        league: format!("{category} / {league}"),
        odds: OddsBook::new(home, draw, away),
        trends: Trends::default(),
        total_matches: raw.bet_count.as_ref().and_then(coerce_count).unwrap_or(0),
        is_hot: raw.is_hot.as_ref().and_then(Value::as_bool).unwrap_or(false),
        last_updated: Utc::now(),
    })
}

/// Normalizuje celý batch. Vadné záznamy a duplicitní id se přeskočí a zalogují.
pub fn normalize_all(events: &[Value]) -> NormalizeReport {
    let mut matches = Vec::with_capacity(events.len());
    let mut seen = HashSet::new();
    let mut dropped = 0usize;

    for (index, event) in events.iter().enumerate() {
        match normalize(event) {
            Ok(m) => {
                if !seen.insert(m.id.clone()) {
                    warn!("skipping event at index {}: duplicate id {}", index, m.id);
                    dropped += 1;
                    continue;
                }
                matches.push(m);
            }
            Err(e) => {
                warn!("skipping event at index {}: {}", index, e);
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        warn!("filtered out {} invalid events", dropped);
    }
    info!("normalized {} out of {} events", matches.len(), events.len());

    NormalizeReport {
        matches,
        total: events.len(),
        dropped,
    }
}

fn required<'a>(field: &'a Option<Value>, name: &'static str) -> Result<&'a Value, ValidationError> {
    match field {
        None | Some(Value::Null) => Err(ValidationError::MissingField(name)),
        Some(v) => Ok(v),
    }
}

fn team_name(value: &Value, name: &'static str) -> Result<String, ValidationError> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(UNKNOWN_TEAM.to_string()),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ValidationError::InvalidField(name)),
    }
}

fn display_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn positive_odds(value: &Value, name: &'static str) -> Result<f64, ValidationError> {
    coerce_number(value)
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or(ValidationError::InvalidOdds(name))
}

/// Permisivní převod na číslo: JSON number, nebo string s číselným prefixem ("2.10", "1.5x").
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }
}

fn parse_float_prefix(raw: &str) -> Option<f64> {
    let candidate: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        .collect();

    (1..=candidate.len())
        .rev()
        .find_map(|len| candidate[..len].parse::<f64>().ok())
}

fn coerce_count(value: &Value) -> Option<u64> {
    let n = coerce_number(value)?;
    if n.is_finite() && n >= 0.0 {
        Some(n.floor() as u64)
    } else {
        None
    }
}

/// "HH:MM Ddd MM/DD" v lokálním čase, nebo "TBD" když datum nejde přečíst.
pub fn format_event_time(value: Option<&Value>) -> String {
    value
        .and_then(parse_event_time)
        .map(|dt| dt.format("%H:%M %a %m/%d").to_string())
        .unwrap_or_else(|| TIME_PLACEHOLDER.to_string())
}

fn parse_event_time(value: &Value) -> Option<DateTime<Local>> {
    match value {
        Value::Number(n) => Utc
            .timestamp_millis_opt(n.as_i64()?)
            .single()
            .map(|dt| dt.with_timezone(&Local)),
        Value::String(s) => parse_event_time_str(s.trim()),
        _ => None,
    }
}

fn parse_event_time_str(s: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    // bez offsetu = lokální čas
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    // samotné datum = půlnoc UTC
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).with_timezone(&Local))
}

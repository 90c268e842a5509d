/// OddsBoard Live: Logger
/// tracing init + JSONL event stream (audit only, nothing is read back)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

/// Stejné nastavení jako ve všech binárkách: RUST_LOG, jinak `info`.
pub fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .try_init();
}

#[derive(Debug, Clone)]
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Best-effort: audit log nesmí shodit update cyklus.
    pub fn log_quiet<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.log(event) {
            tracing::warn!("event log write failed: {}", e);
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct MatchesLoadedEvent {
    pub ts:        String,
    pub event:     &'static str,   // "MATCHES_LOADED"
    pub operation: String,         // "initial" | "refresh"
    pub source:    String,         // "api" | "json"
    pub total:     usize,
    pub dropped:   usize,
}

#[derive(Serialize, Debug)]
pub struct PollTickEvent {
    pub ts:             String,
    pub event:          &'static str,   // "POLL_TICK"
    pub mode:           String,         // "api" | "mock"
    pub directives:     usize,
    pub api_call_count: u64,
}

#[derive(Serialize, Debug)]
pub struct ErrorRecordedEvent {
    pub ts:      String,
    pub event:   &'static str,   // "ERROR_RECORDED"
    pub kind:    String,
    pub message: String,
    pub details: Option<String>,
}

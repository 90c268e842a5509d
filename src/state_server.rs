//! Minimální HTTP nad stavem boardu (čtení + ovládací akce prezentační vrstvy).
//!
//! GET  /health, /state, /matches?page=N&per_page=M
//! POST /auto-update/toggle, /mode/{api|mock}, /interval/{ms}, /refresh, /retry,
//!      /errors/clear, /odds/{match_id}/{home|draw|away}/nudge

use anyhow::{Context, Result};
use odds_feed::{MatchId, Outcome};
use parking_lot::Mutex;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::scheduler::PollingScheduler;
use crate::state::{MatchesAction, UpdateMode, DEFAULT_PAGE_SIZE};
use crate::store::{DataSource, Store};

#[derive(Clone)]
pub struct ServerState {
    pub store: Store,
    pub scheduler: Arc<Mutex<PollingScheduler>>,
    pub data_source: DataSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Health,
    State,
    Matches { page: usize, per_page: usize },
    ToggleAutoUpdate,
    SetMode(UpdateMode),
    SetInterval(u64),
    Refresh,
    Retry,
    ClearErrors,
    Nudge { match_id: MatchId, outcome: Outcome },
    BadRequest(String),
    NotFound,
}

pub fn parse_route(method: &str, target: &str) -> Route {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        ("GET", ["health"]) => Route::Health,
        ("GET", ["state"]) => Route::State,
        ("GET", ["matches"]) => Route::Matches {
            page: query_param(query, "page").unwrap_or(1),
            per_page: query_param(query, "per_page").unwrap_or(DEFAULT_PAGE_SIZE),
        },
        ("POST", ["auto-update", "toggle"]) => Route::ToggleAutoUpdate,
        ("POST", ["mode", mode]) => match mode.parse::<UpdateMode>() {
            Ok(m) => Route::SetMode(m),
            Err(e) => Route::BadRequest(e),
        },
        ("POST", ["interval", ms]) => match ms.parse::<u64>() {
            Ok(ms) => Route::SetInterval(ms),
            Err(_) => Route::BadRequest(format!("invalid interval `{ms}`")),
        },
        ("POST", ["refresh"]) => Route::Refresh,
        ("POST", ["retry"]) => Route::Retry,
        ("POST", ["errors", "clear"]) => Route::ClearErrors,
        ("POST", ["odds", id, outcome, "nudge"]) => {
            let outcome = match *outcome {
                "home" => Outcome::Home,
                "draw" => Outcome::Draw,
                "away" => Outcome::Away,
                other => return Route::BadRequest(format!("unknown outcome `{other}`")),
            };
            Route::Nudge { match_id: MatchId::new(*id), outcome }
        }
        _ => Route::NotFound,
    }
}

fn query_param(query: &str, key: &str) -> Option<usize> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.parse().ok())
}

const JSON: &str = "application/json; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

fn accepted(what: &str) -> (&'static str, &'static str, String) {
    ("HTTP/1.1 202 Accepted", JSON, json!({ "accepted": what }).to_string())
}

async fn handle_http_connection(mut stream: TcpStream, state: ServerState) -> Result<()> {
    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await.context("http read")?;
    if n == 0 {
        return Ok(());
    }

    let req = String::from_utf8_lossy(&buf[..n]);
    let first_line = req.lines().next().unwrap_or_default();
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");

    let (status_line, content_type, body) = match parse_route(method, target) {
        Route::Health => ("HTTP/1.1 200 OK", TEXT, "ok".to_string()),
        Route::State => {
            let json = state
                .store
                .read(|s| serde_json::to_string_pretty(&s.view()))
                .unwrap_or_else(|_| "{}".to_string());
            ("HTTP/1.1 200 OK", JSON, json)
        }
        Route::Matches { page, per_page } => {
            let json = state
                .store
                .read(|s| serde_json::to_string(&s.page(page, per_page)))
                .unwrap_or_else(|_| "{}".to_string());
            ("HTTP/1.1 200 OK", JSON, json)
        }
        Route::ToggleAutoUpdate => {
            state.store.dispatch(MatchesAction::ToggleAutoUpdate);
            let enabled = state.store.read(|s| s.is_auto_update_enabled());
            info!("auto-update {}", if enabled { "enabled" } else { "disabled" });
            ("HTTP/1.1 200 OK", JSON, json!({ "autoUpdate": enabled }).to_string())
        }
        Route::SetMode(mode) => {
            state.scheduler.lock().set_update_mode(mode);
            ("HTTP/1.1 200 OK", JSON, json!({ "updateMode": mode }).to_string())
        }
        Route::SetInterval(ms) => {
            state.scheduler.lock().set_polling_interval(ms);
            let applied = state.store.read(|s| s.polling_interval_ms());
            ("HTTP/1.1 200 OK", JSON, json!({ "pollingInterval": applied }).to_string())
        }
        Route::Refresh => {
            let store = state.store.clone();
            tokio::spawn(async move {
                let _ = store.refresh_all().await;
            });
            accepted("refresh")
        }
        Route::Retry => {
            let store = state.store.clone();
            let source = state.data_source;
            tokio::spawn(async move {
                let _ = store.retry_initial_load(source).await;
            });
            accepted("retry")
        }
        Route::ClearErrors => {
            state.store.dispatch(MatchesAction::ClearError);
            state.store.dispatch(MatchesAction::ClearErrorHistory);
            ("HTTP/1.1 200 OK", JSON, json!({ "cleared": true }).to_string())
        }
        Route::Nudge { match_id, outcome } => match state.store.nudge_outcome(&match_id, outcome) {
            Some(directive) => (
                "HTTP/1.1 200 OK",
                JSON,
                serde_json::to_string(&directive).unwrap_or_else(|_| "{}".to_string()),
            ),
            None => ("HTTP/1.1 404 Not Found", TEXT, format!("match {match_id} not found")),
        },
        Route::BadRequest(reason) => ("HTTP/1.1 400 Bad Request", TEXT, reason),
        Route::NotFound => ("HTTP/1.1 404 Not Found", TEXT, "not found".to_string()),
    };

    let resp = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.as_bytes().len(),
        body
    );
    stream.write_all(resp.as_bytes()).await.context("http write")?;
    Ok(())
}

pub async fn serve(listener: TcpListener, state: ServerState) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await.context("http accept")?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_http_connection(stream, state).await {
                debug!("http handler err {}: {}", peer, e);
            }
        });
    }
}

pub async fn start_state_server(state: ServerState, bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind).await.context("http bind")?;
    info!("state endpoint listening on http://{} (GET /health, /state, /matches)", bind);
    if let Err(e) = serve(listener, state).await {
        warn!("state endpoint stopped: {}", e);
        return Err(e);
    }
    Ok(())
}

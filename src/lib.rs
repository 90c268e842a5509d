/// OddsBoard Live: stav boardu, update lifecycle a polling.
///
/// Data tečou: odds_feed (fetch + normalizace) → odds_engine (direktivy)
/// → `Store` (jediná mutace přes `MatchesAction`) → prezentace (`state_server`).

pub mod config;
pub mod scheduler;
pub mod state;
pub mod state_server;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::AppConfig;
pub use scheduler::{poll_tick, PollingScheduler};
pub use state::{
    ConnectionStatus, ErrorKind, ErrorRecord, LoadingOperation, LoadingStates, MatchPage,
    MatchesAction, MatchesState, NewError, StateView, UpdateMode,
};
pub use store::{DataSource, LifecycleError, Store, StoreConfig};

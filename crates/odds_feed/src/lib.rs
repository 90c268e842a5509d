/// OddsBoard Live: Odds Feed
///
/// Odkud se berou zápasy:
///   A) remote JSON pole eventů (timeout + retry/backoff), normalizované na `Match`
///   B) statický snapshot `{ matches: [...] }` jako fallback
///
/// Nic nepersistuje, jen vrací data storu.

pub mod error;
pub mod fetcher;
pub mod model;
pub mod normalize;
pub mod snapshot;

pub use error::{FetchError, SnapshotError, ValidationError};
pub use fetcher::{retry_with_backoff, EventSource, FeedClient, FetcherConfig, DEFAULT_EVENTS_URL};
pub use model::{round2, Match, MatchId, OddsBook, Outcome, Trend, Trends, MIN_ODDS};
pub use normalize::{normalize, normalize_all, NormalizeReport, RawEvent};
pub use snapshot::{load_snapshot_file, parse_snapshot};

use thiserror::Error;

/// Jeden upstream záznam, který nejde převést na `Match`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("event is not an object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` has an unusable value")]
    InvalidField(&'static str),

    #[error("odds `{0}` must be a positive number")]
    InvalidOdds(&'static str),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("HTTP error! status: {status}")]
    Client { status: u16 },

    #[error("HTTP error! status: {status}")]
    Server { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    Schema(String),

    #[error("Event with ID {0} not found")]
    NotFound(String),
}

impl FetchError {
    /// Timeout, 5xx a síťové chyby se opakují; 4xx a špatné schéma ne.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout | FetchError::Server { .. } | FetchError::Network(_)
        )
    }

    /// Klasifikace ne-2xx statusu. 408 je timeout, ne klientská chyba.
    pub fn from_status(status: u16) -> Self {
        match status {
            408 => FetchError::Timeout,
            400..=499 => FetchError::Client { status },
            _ => FetchError::Server { status },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Timeout => Some(408),
            FetchError::Client { status } | FetchError::Server { status } => Some(*status),
            FetchError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Client { .. } => "client_error",
            FetchError::Server { .. } => "server_error",
            FetchError::Network(_) => "network_error",
            FetchError::Schema(_) => "schema_error",
            FetchError::NotFound(_) => "not_found",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Schema(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::from_status(status.as_u16())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

use thiserror::Error;

/// Failure talking to the market-data, account or execution venue.
///
/// These are retryable: the engine retries them with a fixed delay and escalates
/// to a reconnect before giving up.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("venue returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed venue response: {0}")]
    Decode(String),
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),
    #[error("venue unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Conditions that stop the agent for good
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("startup failed: {0}")]
    Startup(String),
    #[error("{operation} still failing after {attempts} reconnect attempts: {source}")]
    ReconnectExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: VenueError,
    },
}

use thiserror::Error;

/// Failure taxonomy for a scan run. `InvalidCutoff` and `InsufficientRoster`
/// abort before any network call; the rest are recoverable or isolated to a
/// single tracked player.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    // HTTP 429, or the legacy signature of a 200 with an empty body
    #[error("rate limited by upstream")]
    RateLimited,

    #[error("still rate limited after {attempts} pauses fetching {subject}")]
    RateLimitExceeded { subject: String, attempts: usize },

    #[error("no account found for nickname {nickname:?}")]
    UnknownPlayer { nickname: String },

    #[error("malformed match document {match_id}: {reason}")]
    MalformedMatch { match_id: u64, reason: String },

    #[error("cutoff date {date} is outside the last {max_days} days")]
    InvalidCutoff { date: String, max_days: i64 },

    #[error("roster needs at least two players, found {count}")]
    InsufficientRoster { count: usize },

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

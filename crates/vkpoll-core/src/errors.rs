/// Core error type for the long-poll client.
///
/// Adapter crates map their transport errors into this type so callers of the
/// poll loop can tell fatal protocol failures apart from plumbing failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// `*.getLongPollServer` failed or returned an incomplete payload.
    #[error("long-poll handoff failed: {0}")]
    Handoff(String),

    /// The poll endpoint refused the request at the HTTP level (403).
    #[error("long-poll transport error: HTTP {status} from {endpoint}")]
    Transport { status: u16, endpoint: String },

    /// `failed == 4`: the server rejected the protocol version.
    #[error("long-poll protocol version rejected by {endpoint}")]
    Version { endpoint: String },

    #[error("long-poll gave up after {attempts} consecutive soft failures")]
    ResyncExhausted { attempts: u32 },

    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("update stream closed after a fatal error")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Fatal errors end an update stream; the session must be rebuilt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Handoff(_)
                | Error::Transport { .. }
                | Error::Version { .. }
                | Error::ResyncExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

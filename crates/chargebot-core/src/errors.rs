/// Core error type.
///
/// Adapter crates map their platform-specific errors into this type so the
/// pumps can handle failures consistently (fallback ladder vs. fatal).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("queue closed")]
    QueueClosed,

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

use std::io;

/// Errors surfaced by the rownin library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unrecognized input symbol {0:?}, expected \"A\" or \"B\"")]
    InvalidSymbol(String),

    #[error("no profile named {0:?}")]
    UnknownProfile(String),

    #[error("profile store i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("profile data is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Render the error as a single console reply line
    pub fn to_reply(&self) -> String {
        match self {
            Error::WrongArity(cmd) => {
                format!("ERR wrong number of arguments for '{}' command", cmd)
            }
            Error::InvalidCommand(cmd) => format!("ERR unknown command '{}'", cmd),
            _ => format!("ERR {}", self),
        }
    }
}

//! Error types for the Nightfall node.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Engine error: {0}")]
    Engine(#[from] nightfall_engine::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<nightfall_clock::ClockError> for Error {
    fn from(err: nightfall_clock::ClockError) -> Self {
        Error::Config(err.to_string())
    }
}

//! Error types for finsight

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed transaction {id}: {reason}")]
    Malformed { id: i64, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

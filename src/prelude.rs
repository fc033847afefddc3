pub use ledgerdex_core::*;
pub use ledgerdex_redb3::OutputStore;

pub use crate::bridge::FileBridge;

use miette::Diagnostic;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    IndexError(#[from] IndexError),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub fn config(text: impl Display) -> Error {
        Error::ConfigError(text.to_string())
    }

    pub fn parse(error: impl Display) -> Error {
        Error::ParseError(error.to_string())
    }

    pub fn storage(error: impl Display) -> Error {
        Error::StorageError(error.to_string())
    }

    pub fn message(text: impl Into<String>) -> Error {
        Error::Message(text.into())
    }
}

impl From<ledgerdex_redb3::Error> for Error {
    fn from(err: ledgerdex_redb3::Error) -> Self {
        Error::storage(err)
    }
}

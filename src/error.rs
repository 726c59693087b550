use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring a simulation run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: missing field `{field}`")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: invalid integer in field `{field}`: {source}")]
    ParseInt {
        line: usize,
        field: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("line {line}: invalid number in field `{field}`: {source}")]
    ParseFloat {
        line: usize,
        field: &'static str,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("a logger has already been installed")]
    LoggerAlreadySet,
}

pub type Result<T> = std::result::Result<T, Error>;

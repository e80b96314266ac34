use calibro::ParseMethodError;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unable to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("unable to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed json in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unable to write the response: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Method(#[from] ParseMethodError),
    #[error("estimation failed: {0}")]
    Calibro(#[from] calibro::Error),
}

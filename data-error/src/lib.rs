use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MemojiError>;

#[derive(Error, Debug)]
pub enum MemojiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(String),
    #[error("Parsing error")]
    Parse,
    #[error("Storage error: {0} {1}")]
    Storage(String, String),
    #[error("Asset error: {0:?} {1}")]
    Asset(PathBuf, String),
    #[error("Render error: {0}")]
    Render(String),
}

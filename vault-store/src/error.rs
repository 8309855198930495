//! Internal error taxonomy for store operations.
//!
//! These never cross the public `VaultStore` boundary: each operation logs
//! the error and collapses it into a plain `bool` / `Option` / empty list so
//! a remote caller cannot tell "blocked" apart from "missing".

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Traversal, symlinked segment, or a canonical path outside the root
    #[error("access denied")]
    Denied,
    #[error("not found")]
    NotFound,
    /// Blank or otherwise unusable caller input, rejected before any I/O
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Map an I/O error, folding `NotFound` into its own variant.
    pub fn from_io(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(e)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

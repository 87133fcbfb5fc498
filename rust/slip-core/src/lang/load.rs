//! Script loading for the `load` native and the command-line runner.

use std::path::Path;

use thiserror::Error;

use crate::gc::Heap;
use crate::lang::eval::{eval_block, read_error, EvalResult};
use crate::lang::parser::{read_all, ParseError};
use crate::lang::scope::Scope;

/// Files at or above this size are rejected before parsing.
pub const MAX_SOURCE_BYTES: usize = 5_000_000;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("File is empty")]
    Empty,
    #[error("File is too big")]
    TooBig,
    #[error("File is not valid UTF-8")]
    InvalidUtf8,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Read a source file in binary mode, enforcing the size limits.
pub fn read_source(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(LoadError::Empty);
    }
    if bytes.len() >= MAX_SOURCE_BYTES {
        return Err(LoadError::TooBig);
    }
    String::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8)
}

/// Parse a file with `read_all` and evaluate each form in `scope`.
/// Failures surface as a `read-error` value.
pub fn load_file(heap: &mut Heap, scope: &mut Scope, path: &Path) -> EvalResult {
    log::debug!("loading {}", path.display());

    let source = match read_source(path) {
        Ok(source) => source,
        Err(error) => {
            let message = error.to_string();
            return Err(read_error(heap, &message, 0));
        }
    };

    let forms = match read_all(heap, &source) {
        Ok(forms) => forms,
        Err(error) => {
            return Err(read_error(heap, &error.message, error.position as i64));
        }
    };

    eval_block(heap, scope, forms)
}
